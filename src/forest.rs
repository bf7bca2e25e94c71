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

//! Assembles a chart into a shared-packed parse forest: alternating `OrNode`
//! (ambiguity) and `AndNode` (one concrete derivation) layers, content
//! addressed by `(head, start, end)` so that identical sub-parses are
//! represented once no matter how many derivations reference them.

use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::chart::{Chart, ItemRef, MultiSlot, SlotValue};
use crate::grammar::Rule;
use crate::symbol::{Matcher, Preference};

pub type NodeRef = usize;

/// One repetition inside a matched star/plus group.
#[derive(Debug)]
pub enum MultiChild {
    Token(usize),
    Sub(NodeRef),
}

impl Clone for MultiChild {
    fn clone(&self) -> Self {
        match self {
            MultiChild::Token(i) => MultiChild::Token(*i),
            MultiChild::Sub(r) => MultiChild::Sub(*r),
        }
    }
}

/// What filled one right-hand-side position of a concrete derivation.
#[derive(Debug)]
pub enum AndChild {
    Token(usize),
    Skipped,
    Sub(NodeRef),
    Multiple(Vec<MultiChild>),
}

impl Clone for AndChild {
    fn clone(&self) -> Self {
        match self {
            AndChild::Token(i) => AndChild::Token(*i),
            AndChild::Skipped => AndChild::Skipped,
            AndChild::Sub(r) => AndChild::Sub(*r),
            AndChild::Multiple(v) => AndChild::Multiple(v.clone()),
        }
    }
}

/// One concrete way of deriving an `OrNode`'s (head, start, end): a rule
/// together with the forest children that filled its right-hand side.
pub struct AndNode<T, M: Matcher<T>> {
    pub rule: Rc<Rule<T, M>>,
    pub children: Vec<AndChild>,
}

impl<T, M: Matcher<T>> Clone for AndNode<T, M> {
    fn clone(&self) -> Self {
        AndNode {
            rule: self.rule.clone(),
            children: self.children.clone(),
        }
    }
}

/// A point of potential ambiguity: every way of deriving `head` over
/// `start..end`. A single surviving alternative after pruning means this
/// span is unambiguous for this head.
pub struct OrNode<T, M: Matcher<T>> {
    pub head: String,
    pub start: usize,
    pub end: usize,
    pub alternatives: Vec<AndNode<T, M>>,
    /// prefer_early/prefer_late contributed by the first symbol reference
    /// that resolved to this node (first-write-wins across call sites that
    /// share it, since the node is interned on `(head, start, end)` alone).
    pub preference: Preference,
}

impl<T, M: Matcher<T>> Clone for OrNode<T, M> {
    fn clone(&self) -> Self {
        OrNode {
            head: self.head.clone(),
            start: self.start,
            end: self.end,
            alternatives: self.alternatives.clone(),
            preference: self.preference,
        }
    }
}

/// Arena of `OrNode`s, interned by `(head, start, end)`.
pub struct Forest<T, M: Matcher<T>> {
    pub nodes: Vec<OrNode<T, M>>,
}

impl<T, M: Matcher<T>> Clone for Forest<T, M> {
    fn clone(&self) -> Self {
        Forest {
            nodes: self.nodes.clone(),
        }
    }
}

/// Handle to the root of an assembled forest.
pub struct ParseForest<T, M: Matcher<T>> {
    pub forest: Forest<T, M>,
    pub root: NodeRef,
}

struct Assembler<'c, T, M: Matcher<T>> {
    chart: &'c Chart<T, M>,
    interner: HashMap<(String, usize, usize), NodeRef>,
}

impl<'c, T, M: Matcher<T>> Assembler<'c, T, M> {
    fn resolve(
        &mut self,
        forest: &mut Forest<T, M>,
        head: &str,
        start: usize,
        end: usize,
        preference: Preference,
    ) -> NodeRef {
        let key = (head.to_string(), start, end);
        if let Some(&nr) = self.interner.get(&key) {
            return nr;
        }
        // Reserve the slot before recursing so a self-referential head
        // (e.g. `s -> s`) resolves to this same id instead of looping.
        let nr = forest.nodes.len();
        forest.nodes.push(OrNode {
            head: head.to_string(),
            start,
            end,
            alternatives: Vec::new(),
            preference,
        });
        self.interner.insert(key, nr);

        let mut alternatives = Vec::new();
        for item in &self.chart.columns[end].items {
            if item.is_complete() && item.origin == start && item.rule.head == head {
                for partial in &item.derivations {
                    let children = self.convert_slots(forest, &item.rule, &partial.slots);
                    alternatives.push(AndNode {
                        rule: item.rule.clone(),
                        children,
                    });
                }
            }
        }
        trace!(
            "forest node {} for {}[{}..{}): {} alternative(s)",
            nr,
            head,
            start,
            end,
            alternatives.len()
        );
        forest.nodes[nr].alternatives = alternatives;
        nr
    }

    fn convert_slots(
        &mut self,
        forest: &mut Forest<T, M>,
        rule: &Rc<Rule<T, M>>,
        slots: &[SlotValue],
    ) -> Vec<AndChild> {
        slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let preference = rule.rhs[i].preference();
                self.convert_slot(forest, slot, preference)
            })
            .collect()
    }

    fn convert_slot(
        &mut self,
        forest: &mut Forest<T, M>,
        slot: &SlotValue,
        preference: Preference,
    ) -> AndChild {
        match slot {
            SlotValue::Token(i) => AndChild::Token(*i),
            SlotValue::Skipped => AndChild::Skipped,
            SlotValue::Sub(r) => AndChild::Sub(self.resolve_ref(forest, *r, preference)),
            SlotValue::Multiple(ms) => AndChild::Multiple(
                ms.iter()
                    .map(|m| match m {
                        MultiSlot::Token(i) => MultiChild::Token(*i),
                        MultiSlot::Sub(r) => MultiChild::Sub(self.resolve_ref(forest, *r, preference)),
                    })
                    .collect(),
            ),
        }
    }

    fn resolve_ref(&mut self, forest: &mut Forest<T, M>, r: ItemRef, preference: Preference) -> NodeRef {
        let item = self.chart.item(r);
        self.resolve(forest, &item.rule.head, item.origin, r.column, preference)
    }
}

/// Assembles the forest for `start` out of a completed chart. Returns
/// `None` if `start` did not accept the whole input (no parse).
pub fn assemble<T, M: Matcher<T>>(chart: &Chart<T, M>, start: &str) -> Option<ParseForest<T, M>> {
    let accepting = chart.accepting_items(start);
    if accepting.is_empty() {
        return None;
    }
    let end = chart.columns.len() - 1;
    let mut forest = Forest { nodes: Vec::new() };
    let mut assembler = Assembler {
        chart,
        interner: HashMap::new(),
    };
    let root = assembler.resolve(&mut forest, start, 0, end, Preference::default());
    Some(ParseForest { forest, root })
}
