/*
    MIT License

    Copyright (c) 2020 Lars Krueger <lars_e_krueger@gmx.de>

    Permission is hereby granted, free of charge, to any person obtaining a copy
    of this software and associated documentation files (the "Software"), to deal
    in the Software without restriction, including without limitation the rights
    to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
    copies of the Software, and to permit persons to whom the Software is
    furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in all
    copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
    OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
    SOFTWARE.
*/

//! Folds a (pruned) forest into an arbitrary value without ever
//! materialising every tree it represents: shared sub-forests are visited
//! once and their builder result reused everywhere they're referenced.

use std::collections::HashMap;

use crate::forest::{AndChild, AndNode, Forest, MultiChild, NodeRef};
use crate::grammar::RuleId;
use crate::symbol::Matcher;

/// Localises one step of a builder fold: which rule is being applied
/// (`None` only when merging at the very root, which has no enclosing
/// rule), which right-hand-side position, and the token span the value
/// being produced covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub rule: Option<RuleId>,
    pub symbol_index: usize,
    pub start_index: usize,
    pub end_index: usize,
}

/// The visitor protocol a client implements to fold a forest into its own
/// value type.
pub trait Builder<T> {
    type Value: Clone;

    /// A matched terminal at `context.start_index`.
    fn terminal(&self, context: Context, token: &T) -> Self::Value;

    /// Folds a skipped optional symbol directly into `prev`, the running
    /// accumulator -- no further [`Builder::extend`] call follows for this
    /// slot.
    fn skip_optional(&self, context: Context, prev: Self::Value) -> Self::Value;

    /// Seeds the fold for one concrete derivation of `context.rule`; every
    /// right-hand-side child is threaded through [`Builder::extend`] (or
    /// [`Builder::skip_optional`]/[`Builder::begin_multiple`]/
    /// [`Builder::end_multiple`] at a quantified slot) in order.
    fn start_rule(&self, context: Context) -> Self::Value;

    /// Folds `extension` (the next right-hand-side position, or the next
    /// repetition inside a group) into `prev`.
    fn extend(&self, context: Context, prev: Self::Value, extension: Self::Value) -> Self::Value;

    /// Folds the start of a star/plus group directly into `prev`; each
    /// matched repetition is then threaded through [`Builder::extend`]
    /// before [`Builder::end_multiple`] closes the group.
    fn begin_multiple(&self, context: Context, prev: Self::Value) -> Self::Value;

    /// Folds the end of a star/plus group directly into `prev`, producing
    /// the value that fills its slot -- no further `extend` call follows.
    fn end_multiple(&self, context: Context, prev: Self::Value) -> Self::Value;

    /// Combines sibling alternatives that weren't eliminated by pruning.
    /// `merge_horizontal`/`merge_vertical` default to this; override them
    /// individually to tell same-rule ambiguity apart from cross-rule
    /// ambiguity.
    fn merge(&self, context: Context, alternatives: Vec<Self::Value>) -> Self::Value;

    /// Same-rule alternatives differing only in how a quantifier matched.
    fn merge_horizontal(&self, context: Context, alternatives: Vec<Self::Value>) -> Self::Value {
        self.merge(context, alternatives)
    }

    /// Alternatives from different rules for the same head.
    fn merge_vertical(&self, context: Context, alternatives: Vec<Self::Value>) -> Self::Value {
        self.merge(context, alternatives)
    }
}

/// Dispatches `builder` over `forest` starting at `node`, memoising every
/// shared node so it is folded exactly once.
pub fn apply<T, M, B>(forest: &Forest<T, M>, node: NodeRef, tokens: &[T], builder: &B) -> B::Value
where
    M: Matcher<T>,
    B: Builder<T>,
{
    let mut memo = HashMap::new();
    let or_node = &forest.nodes[node];
    let context = Context {
        rule: None,
        symbol_index: 0,
        start_index: or_node.start,
        end_index: or_node.end,
    };
    apply_node(forest, node, tokens, builder, &mut memo, context)
}

fn apply_node<T, M, B>(
    forest: &Forest<T, M>,
    node: NodeRef,
    tokens: &[T],
    builder: &B,
    memo: &mut HashMap<NodeRef, B::Value>,
    context: Context,
) -> B::Value
where
    M: Matcher<T>,
    B: Builder<T>,
{
    if let Some(v) = memo.get(&node) {
        return v.clone();
    }
    let or_node = &forest.nodes[node];
    assert!(
        !or_node.alternatives.is_empty(),
        "forest node `{}` has no surviving alternatives",
        or_node.head
    );

    let mut groups: Vec<(RuleId, Vec<&AndNode<T, M>>)> = Vec::new();
    for alt in &or_node.alternatives {
        if let Some(g) = groups.iter_mut().find(|(id, _)| *id == alt.rule.id) {
            g.1.push(alt);
        } else {
            groups.push((alt.rule.id, vec![alt]));
        }
    }

    let mut group_values: Vec<B::Value> = Vec::with_capacity(groups.len());
    for (_, alts) in &groups {
        let mut horizontal: Vec<B::Value> = Vec::with_capacity(alts.len());
        for alt in alts {
            horizontal.push(apply_and(forest, alt, or_node.start, or_node.end, tokens, builder, memo));
        }
        let value = if horizontal.len() > 1 {
            builder.merge_horizontal(context, horizontal)
        } else {
            horizontal.into_iter().next().unwrap()
        };
        group_values.push(value);
    }

    let result = if group_values.len() > 1 {
        builder.merge_vertical(context, group_values)
    } else {
        group_values.into_iter().next().unwrap()
    };
    memo.insert(node, result.clone());
    result
}

#[allow(clippy::too_many_arguments)]
fn apply_and<T, M, B>(
    forest: &Forest<T, M>,
    and: &AndNode<T, M>,
    start: usize,
    end: usize,
    tokens: &[T],
    builder: &B,
    memo: &mut HashMap<NodeRef, B::Value>,
) -> B::Value
where
    M: Matcher<T>,
    B: Builder<T>,
{
    let rule_id = and.rule.id;
    let ctx = |symbol_index: usize, s: usize, e: usize| Context {
        rule: Some(rule_id),
        symbol_index,
        start_index: s,
        end_index: e,
    };
    let mut acc = builder.start_rule(ctx(0, start, end));
    let mut pos = start;
    for (i, child) in and.children.iter().enumerate() {
        match child {
            AndChild::Token(idx) => {
                let c = ctx(i, *idx, *idx + 1);
                let value = builder.terminal(c, &tokens[*idx]);
                acc = builder.extend(c, acc, value);
                pos = idx + 1;
            }
            AndChild::Skipped => {
                let c = ctx(i, pos, pos);
                acc = builder.skip_optional(c, acc);
            }
            AndChild::Sub(r) => {
                let child_node = &forest.nodes[*r];
                let c = ctx(i, child_node.start, child_node.end);
                let value = apply_node(forest, *r, tokens, builder, memo, c);
                acc = builder.extend(c, acc, value);
                pos = child_node.end;
            }
            AndChild::Multiple(items) => {
                let group_start = pos;
                acc = builder.begin_multiple(ctx(i, group_start, group_start), acc);
                for item in items {
                    let (value, c) = match item {
                        MultiChild::Token(idx) => {
                            let c = ctx(i, *idx, *idx + 1);
                            pos = idx + 1;
                            (builder.terminal(c, &tokens[*idx]), c)
                        }
                        MultiChild::Sub(r) => {
                            let child_node = &forest.nodes[*r];
                            let c = ctx(i, child_node.start, child_node.end);
                            pos = child_node.end;
                            (apply_node(forest, *r, tokens, builder, memo, c), c)
                        }
                    };
                    acc = builder.extend(c, acc, value);
                }
                acc = builder.end_multiple(ctx(i, group_start, pos), acc);
            }
        }
    }
    acc
}

/// Generic parse tree: the default shape `single`/`all`/`iter` fold into
/// when the client doesn't supply its own [`Builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tree {
    Token(usize),
    Skipped,
    /// The repetitions of a star/plus group, in order.
    Group(Vec<Tree>),
    /// One rule application, with one entry per right-hand-side position
    /// (a quantified position contributes a single `Group`).
    Node(RuleId, Vec<Tree>),
}

/// [`TreeBuilder`]'s working value. A rule application's children accumulate
/// in `Node` one by one; a star/plus group opens a second, nested
/// accumulation (`Group`) that `end_multiple` folds back into the enclosing
/// `Node` as one child. Distinct from [`Tree`] only so `extend` can tell
/// "append a new right-hand-side child" apart from "append the next
/// repetition of the group currently open" by the accumulator's own shape;
/// [`Accum::into_tree`] converts the finished value at the end of a fold.
#[derive(Debug, Clone)]
pub enum Accum {
    Leaf(Tree),
    Node(RuleId, Vec<Tree>),
    Group {
        outer_rule: RuleId,
        outer_children: Vec<Tree>,
        items: Vec<Tree>,
    },
}

impl Accum {
    pub fn into_tree(self) -> Tree {
        match self {
            Accum::Leaf(t) => t,
            Accum::Node(id, children) => Tree::Node(id, children),
            Accum::Group { .. } => unreachable!("a star/plus group was left open at the end of a fold"),
        }
    }

    fn push(self, value: Tree) -> Accum {
        match self {
            Accum::Node(id, mut children) => {
                children.push(value);
                Accum::Node(id, children)
            }
            Accum::Group {
                outer_rule,
                outer_children,
                mut items,
            } => {
                items.push(value);
                Accum::Group {
                    outer_rule,
                    outer_children,
                    items,
                }
            }
            Accum::Leaf(other) => unreachable!("extend called on a leaf accumulator: {:?}", other),
        }
    }

    fn open_group(self) -> Accum {
        match self {
            Accum::Node(id, children) => Accum::Group {
                outer_rule: id,
                outer_children: children,
                items: Vec::new(),
            },
            other => unreachable!("begin_multiple called on a non-rule accumulator: {:?}", other),
        }
    }

    fn close_group(self) -> Accum {
        match self {
            Accum::Group {
                outer_rule,
                mut outer_children,
                items,
            } => {
                outer_children.push(Tree::Group(items));
                Accum::Node(outer_rule, outer_children)
            }
            other => unreachable!("end_multiple called without an open group: {:?}", other),
        }
    }
}

/// Default [`Builder`] producing a [`Tree`]. Only ever applied to a forest
/// that pruning/enumeration has already reduced to one alternative per
/// node -- `merge` is unreachable in that case and panics if hit.
pub struct TreeBuilder;

impl<T> Builder<T> for TreeBuilder {
    type Value = Accum;

    fn terminal(&self, context: Context, _token: &T) -> Accum {
        Accum::Leaf(Tree::Token(context.start_index))
    }

    fn skip_optional(&self, _context: Context, prev: Accum) -> Accum {
        prev.push(Tree::Skipped)
    }

    fn start_rule(&self, context: Context) -> Accum {
        Accum::Node(context.rule.expect("start_rule is always called inside a rule"), Vec::new())
    }

    fn extend(&self, _context: Context, prev: Accum, extension: Accum) -> Accum {
        prev.push(extension.into_tree())
    }

    fn begin_multiple(&self, _context: Context, prev: Accum) -> Accum {
        prev.open_group()
    }

    fn end_multiple(&self, _context: Context, prev: Accum) -> Accum {
        prev.close_group()
    }

    fn merge(&self, _context: Context, _alternatives: Vec<Accum>) -> Accum {
        panic!("TreeBuilder::merge invoked on an ambiguous forest; use single()/all()/iter() instead")
    }
}

/// Counts the number of distinct derivations without building any of them.
/// Plain multiplication already gives the right count for a group's
/// repetitions folding into the rule total, so `begin_multiple`/
/// `end_multiple` are identities here -- no separate group state is needed.
pub struct CountBuilder;

impl<T> Builder<T> for CountBuilder {
    type Value = u64;

    fn terminal(&self, _context: Context, _token: &T) -> u64 {
        1
    }

    fn skip_optional(&self, _context: Context, prev: u64) -> u64 {
        prev
    }

    fn start_rule(&self, _context: Context) -> u64 {
        1
    }

    fn extend(&self, _context: Context, prev: u64, extension: u64) -> u64 {
        prev * extension
    }

    fn begin_multiple(&self, _context: Context, prev: u64) -> u64 {
        prev
    }

    fn end_multiple(&self, _context: Context, prev: u64) -> u64 {
        prev
    }

    fn merge(&self, _context: Context, alternatives: Vec<u64>) -> u64 {
        alternatives.into_iter().sum()
    }
}

/// Builds one [`Tree`] per surviving alternative at `node`, for error
/// reporting on an ambiguous forest. Any ambiguity deeper in the forest
/// (below the node being reported) is resolved to its first surviving
/// alternative rather than raised again -- these are partial, diagnostic
/// values, not a guarantee that the whole subtree is itself unambiguous.
pub fn partial_alternatives<T, M: Matcher<T>>(forest: &Forest<T, M>, node: NodeRef, tokens: &[T]) -> Vec<Tree> {
    let or_node = &forest.nodes[node];
    let mut memo = HashMap::new();
    or_node
        .alternatives
        .iter()
        .map(|alt| apply_and(forest, alt, or_node.start, or_node.end, tokens, &FirstChoiceBuilder, &mut memo).into_tree())
        .collect()
}

struct FirstChoiceBuilder;

impl<T> Builder<T> for FirstChoiceBuilder {
    type Value = Accum;

    fn terminal(&self, context: Context, token: &T) -> Accum {
        TreeBuilder.terminal(context, token)
    }

    fn skip_optional(&self, context: Context, prev: Accum) -> Accum {
        <TreeBuilder as Builder<T>>::skip_optional(&TreeBuilder, context, prev)
    }

    fn start_rule(&self, context: Context) -> Accum {
        <TreeBuilder as Builder<T>>::start_rule(&TreeBuilder, context)
    }

    fn extend(&self, context: Context, prev: Accum, extension: Accum) -> Accum {
        <TreeBuilder as Builder<T>>::extend(&TreeBuilder, context, prev, extension)
    }

    fn begin_multiple(&self, context: Context, prev: Accum) -> Accum {
        <TreeBuilder as Builder<T>>::begin_multiple(&TreeBuilder, context, prev)
    }

    fn end_multiple(&self, context: Context, prev: Accum) -> Accum {
        <TreeBuilder as Builder<T>>::end_multiple(&TreeBuilder, context, prev)
    }

    fn merge(&self, _context: Context, alternatives: Vec<Accum>) -> Accum {
        alternatives.into_iter().next().expect("merge called with no alternatives")
    }
}

/// The leftmost (by creation order) node still carrying more than one
/// alternative, if any.
pub fn first_ambiguous<T, M: Matcher<T>>(forest: &Forest<T, M>) -> Option<NodeRef> {
    forest.nodes.iter().position(|n| n.alternatives.len() > 1)
}

/// Every node with more than one surviving alternative, in creation order.
pub fn ambiguous_nodes<T, M: Matcher<T>>(forest: &Forest<T, M>) -> Vec<NodeRef> {
    forest
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.alternatives.len() > 1)
        .map(|(i, _)| i)
        .collect()
}

/// Clones `forest`, pinning each node named in `assignment` to exactly the
/// alternative index given, leaving everything else untouched. Node ids are
/// preserved so existing `NodeRef`s stay valid.
pub fn pin<T, M: Matcher<T>>(forest: &Forest<T, M>, assignment: &HashMap<NodeRef, usize>) -> Forest<T, M> {
    let mut out = forest.clone();
    for (&node, &choice) in assignment {
        out.nodes[node].alternatives = vec![out.nodes[node].alternatives[choice].clone()];
    }
    out
}

/// Lazily enumerates every combination of ambiguous-node choices, folding
/// each one with [`TreeBuilder`].
pub struct Combinations<'t, T, M: Matcher<T>> {
    forest: Forest<T, M>,
    root: NodeRef,
    tokens: &'t [T],
    nodes: Vec<NodeRef>,
    radices: Vec<usize>,
    counter: Vec<usize>,
    done: bool,
    started: bool,
}

impl<'t, T, M: Matcher<T>> Combinations<'t, T, M> {
    pub fn new(forest: &Forest<T, M>, root: NodeRef, tokens: &'t [T]) -> Self {
        let nodes = ambiguous_nodes(forest);
        let radices: Vec<usize> = nodes.iter().map(|&n| forest.nodes[n].alternatives.len()).collect();
        let counter = vec![0; nodes.len()];
        Combinations {
            forest: forest.clone(),
            root,
            tokens,
            nodes,
            radices,
            counter,
            done: false,
            started: false,
        }
    }
}

impl<'t, T, M: Matcher<T>> Iterator for Combinations<'t, T, M> {
    type Item = Tree;

    fn next(&mut self) -> Option<Tree> {
        if self.done {
            return None;
        }
        if self.nodes.is_empty() {
            if self.started {
                return None;
            }
            self.started = true;
            self.done = true;
            let pinned = pin(&self.forest, &HashMap::new());
            return Some(apply(&pinned, self.root, self.tokens, &TreeBuilder).into_tree());
        }
        self.started = true;
        let assignment: HashMap<NodeRef, usize> = self
            .nodes
            .iter()
            .copied()
            .zip(self.counter.iter().copied())
            .collect();
        let pinned = pin(&self.forest, &assignment);
        let value = apply(&pinned, self.root, self.tokens, &TreeBuilder).into_tree();

        let mut i = 0;
        loop {
            if i >= self.counter.len() {
                self.done = true;
                break;
            }
            self.counter[i] += 1;
            if self.counter[i] < self.radices[i] {
                break;
            }
            self.counter[i] = 0;
            i += 1;
        }
        Some(value)
    }
}
