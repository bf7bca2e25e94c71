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

//! Ambiguity-taming passes over an assembled forest, applied in a fixed
//! order: per-rule penalty, then greedy/lazy, then prefer-early/prefer-late.
//! Followed by infinite-parse detection on what survives.

use log::debug;

use crate::error::ParseError;
use crate::forest::{AndChild, AndNode, Forest, MultiChild, NodeRef, OrNode};
use crate::grammar::RuleId;
use crate::symbol::Matcher;

/// Runs all three pruning layers, then checks for an infinite parse.
/// `root` only matters for error localisation; pruning itself walks the
/// whole arena, which `assemble` only ever populates with nodes reachable
/// from the root it was asked to build.
pub fn prune<T, M: Matcher<T>>(forest: &mut Forest<T, M>) -> Result<(), ParseError> {
    let penalties = min_penalties(forest);
    for i in 0..forest.nodes.len() {
        prune_penalty(&mut forest.nodes[i], &penalties);
    }
    for i in 0..forest.nodes.len() {
        prune_greedy_lazy(&mut forest.nodes[i]);
    }
    for i in 0..forest.nodes.len() {
        prune_prefer_early_late(&mut forest.nodes[i]);
    }
    if let Some(cycle) = detect_infinite(forest) {
        let node = &forest.nodes[cycle];
        debug!(
            "infinite parse detected at {}[{}..{})",
            node.head, node.start, node.end
        );
        return Err(ParseError::InfiniteParse {
            message: format!("`{}` derives itself with zero width", node.head),
            start_index: node.start,
            end_index: node.end,
        });
    }
    Ok(())
}

fn and_cost<T, M: Matcher<T>>(and: &AndNode<T, M>, penalties: &[Option<u32>]) -> Option<u32> {
    let mut total = and.rule.penalty;
    for child in &and.children {
        match child {
            AndChild::Token(_) | AndChild::Skipped => {}
            AndChild::Sub(r) => total += penalties[*r]?,
            AndChild::Multiple(ms) => {
                for m in ms {
                    if let MultiChild::Sub(r) = m {
                        total += penalties[*r]?;
                    }
                }
            }
        }
    }
    Some(total)
}

/// Bellman-Ford-style fixed point: since penalties are non-negative and the
/// graph has finitely many nodes, `nodes.len() + 1` relaxation passes are
/// always enough to converge, cycles or not.
fn min_penalties<T, M: Matcher<T>>(forest: &Forest<T, M>) -> Vec<Option<u32>> {
    let n = forest.nodes.len();
    let mut penalties: Vec<Option<u32>> = vec![None; n];
    for _ in 0..=n {
        let mut changed = false;
        for (i, node) in forest.nodes.iter().enumerate() {
            let mut best: Option<u32> = None;
            for alt in &node.alternatives {
                if let Some(cost) = and_cost(alt, &penalties) {
                    best = Some(best.map_or(cost, |b: u32| b.min(cost)));
                }
            }
            if best != penalties[i] {
                penalties[i] = best;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    penalties
}

fn prune_penalty<T, M: Matcher<T>>(node: &mut OrNode<T, M>, penalties: &[Option<u32>]) {
    let costs: Vec<Option<u32>> = node
        .alternatives
        .iter()
        .map(|alt| and_cost(alt, penalties))
        .collect();
    let min = costs.iter().filter_map(|c| *c).min();
    let Some(min) = min else {
        // No alternative has a finite cost (every path recurses without a
        // finite base case): leave pruning to the infinite-parse check.
        return;
    };
    let mut i = 0;
    node.alternatives.retain(|_| {
        let keep = costs[i] == Some(min);
        i += 1;
        keep
    });
}

fn slot_count(child: &AndChild) -> usize {
    match child {
        AndChild::Skipped => 0,
        AndChild::Token(_) | AndChild::Sub(_) => 1,
        AndChild::Multiple(v) => v.len(),
    }
}

fn group_by_rule<T, M: Matcher<T>>(node: &OrNode<T, M>) -> Vec<(RuleId, Vec<usize>)> {
    let mut groups: Vec<(RuleId, Vec<usize>)> = Vec::new();
    for (i, alt) in node.alternatives.iter().enumerate() {
        if let Some(g) = groups.iter_mut().find(|(id, _)| *id == alt.rule.id) {
            g.1.push(i);
        } else {
            groups.push((alt.rule.id, vec![i]));
        }
    }
    groups
}

/// Within each same-rule group (horizontal ambiguity: different quantifier
/// splits of the same rule), keeps only the alternatives that win at the
/// leftmost quantified slot carrying a greedy/lazy preference.
fn prune_greedy_lazy<T, M: Matcher<T>>(node: &mut OrNode<T, M>) {
    let groups = group_by_rule(node);
    let mut keep = vec![true; node.alternatives.len()];
    for (_, indices) in &groups {
        if indices.len() <= 1 {
            continue;
        }
        let rule = node.alternatives[indices[0]].rule.clone();
        let mut survivors = indices.clone();
        for (j, symbol) in rule.rhs.iter().enumerate() {
            if survivors.len() <= 1 {
                break;
            }
            let preference = symbol.preference();
            if !(preference.greedy || preference.lazy) {
                continue;
            }
            let counts: Vec<(usize, usize)> = survivors
                .iter()
                .map(|&idx| (idx, slot_count(&node.alternatives[idx].children[j])))
                .collect();
            let target = if preference.greedy {
                counts.iter().map(|&(_, c)| c).max().unwrap()
            } else {
                counts.iter().map(|&(_, c)| c).min().unwrap()
            };
            survivors = counts
                .into_iter()
                .filter(|&(_, c)| c == target)
                .map(|(idx, _)| idx)
                .collect();
        }
        for &idx in indices {
            if !survivors.contains(&idx) {
                keep[idx] = false;
            }
        }
    }
    let mut i = 0;
    node.alternatives.retain(|_| {
        let k = keep[i];
        i += 1;
        k
    });
}

/// Across rule-groups (vertical ambiguity: different rules for the same
/// head), keeps only the group with the lowest (prefer_early) or highest
/// (prefer_late) rule insertion-order id, if the node carries such a
/// preference at all.
fn prune_prefer_early_late<T, M: Matcher<T>>(node: &mut OrNode<T, M>) {
    if !(node.preference.prefer_early || node.preference.prefer_late) {
        return;
    }
    let ids: Vec<RuleId> = node.alternatives.iter().map(|a| a.rule.id).collect();
    if ids.is_empty() {
        return;
    }
    let target = if node.preference.prefer_early {
        *ids.iter().min().unwrap()
    } else {
        *ids.iter().max().unwrap()
    };
    node.alternatives.retain(|a| a.rule.id == target);
}

/// The `Sub`/`Multiple(Sub)` children of `and` -- the only kind of child an
/// infinite-parse cycle can run through, since `Token`/`Skipped` children
/// don't reference another `OrNode`.
fn sub_node_children<T, M: Matcher<T>>(and: &AndNode<T, M>) -> Vec<NodeRef> {
    let mut out = Vec::new();
    for child in &and.children {
        match child {
            AndChild::Sub(r) => out.push(*r),
            AndChild::Multiple(ms) => {
                for m in ms {
                    if let MultiChild::Sub(r) = m {
                        out.push(*r);
                    }
                }
            }
            AndChild::Token(_) | AndChild::Skipped => {}
        }
    }
    out
}

/// Detects a cycle of same-span edges: a node reachable from itself via a
/// chain of `AndNode` children whose span is identical to the span of the
/// node the search started from. This is *not* "every node on the cycle has
/// zero input width" -- a self-reference like `s -> s; s -> "word"` over
/// `["word"]` produces a node spanning exactly one token that still cycles
/// through an edge of that same span, and must be reported as infinite.
/// Reports existence only, not full strongly-connected-component membership.
fn detect_infinite<T, M: Matcher<T>>(forest: &Forest<T, M>) -> Option<NodeRef> {
    const UNVISITED: u8 = 0;
    const IN_STACK: u8 = 1;
    const DONE: u8 = 2;
    let n = forest.nodes.len();
    let mut state = vec![UNVISITED; n];

    fn dfs<T, M: Matcher<T>>(
        forest: &Forest<T, M>,
        node: NodeRef,
        target_start: usize,
        target_end: usize,
        state: &mut [u8],
    ) -> Option<NodeRef> {
        state[node] = IN_STACK;
        for alt in &forest.nodes[node].alternatives {
            for child in sub_node_children(alt) {
                if forest.nodes[child].start != target_start || forest.nodes[child].end != target_end {
                    continue;
                }
                match state[child] {
                    IN_STACK => return Some(child),
                    UNVISITED => {
                        if let Some(c) = dfs(forest, child, target_start, target_end, state) {
                            return Some(c);
                        }
                    }
                    _ => {}
                }
            }
        }
        state[node] = DONE;
        None
    }

    for i in 0..n {
        if state[i] == UNVISITED {
            let (start, end) = (forest.nodes[i].start, forest.nodes[i].end);
            if let Some(c) = dfs(forest, i, start, end, &mut state) {
                return Some(c);
            }
            // A search rooted at `i` only ever marks DONE/IN_STACK on nodes
            // sharing `i`'s span (the child filter above guarantees that),
            // so it's safe to reuse `state` across roots with different
            // spans without any being visited twice.
        }
    }
    None
}
