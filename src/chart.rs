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

//! The recognizer: an Earley chart extended with an inline quantifier
//! sub-state so `?`/`*`/`+` on a right-hand-side symbol don't require
//! rewriting the grammar into a quantifier-free one first.
//!
//! Every item's "symbol under the dot" is either plain or carries a
//! [`Quantifier`]; an item's [`QuantState`] records whether it is still
//! waiting to match that symbol for the first time (`Before`) or has matched
//! it at least once and may match again or move on (`Inside`).

use std::collections::HashMap;
use std::rc::Rc;

use log::trace;

use crate::grammar::{Rule, RuleId, RuleSet};
use crate::symbol::{Matcher, Quantifier, Symbol};

/// Where an item's "symbol under the dot" stands with respect to its
/// quantifier. Plain symbols and `?` only ever occupy `Before`; `*`/`+`
/// occupy `Inside` once matched at least once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantState {
    Before,
    Inside,
}

/// Points at one item living in a specific column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef {
    pub column: usize,
    pub index: usize,
}

/// What filled one repetition of a quantified slot, or a scanned token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiSlot {
    Token(usize),
    Sub(ItemRef),
}

/// What filled one right-hand-side position of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Token(usize),
    Skipped,
    Sub(ItemRef),
    Multiple(Vec<MultiSlot>),
}

/// One way of having reached a given item: the fully resolved slots for every
/// right-hand-side position processed so far, plus -- if the item is
/// currently `Inside` a quantifier group -- the repetitions accumulated for
/// the in-progress group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partial {
    pub slots: Vec<SlotValue>,
    pub pending: Vec<MultiSlot>,
}

impl Partial {
    fn empty() -> Self {
        Partial {
            slots: Vec::new(),
            pending: Vec::new(),
        }
    }
}

/// A partial (or, if `dot == rule.rhs.len()`, complete) parse of `rule`,
/// started at `origin`, living in the column that owns it.
pub struct Item<T, M: Matcher<T>> {
    pub rule: Rc<Rule<T, M>>,
    pub dot: usize,
    pub origin: usize,
    pub quant: QuantState,
    pub derivations: Vec<Partial>,
}

impl<T, M: Matcher<T>> Item<T, M> {
    pub fn is_complete(&self) -> bool {
        self.dot == self.rule.rhs.len()
    }

    pub fn symbol_under_dot(&self) -> Option<&Symbol<T, M>> {
        self.rule.rhs.get(self.dot)
    }
}

#[derive(PartialEq, Eq, Hash)]
struct ItemKey {
    rule_id: RuleId,
    dot: usize,
    origin: usize,
    quant: QuantState,
}

/// All items reached after consuming the first N tokens, for one N.
pub struct Column<T, M: Matcher<T>> {
    pub items: Vec<Item<T, M>>,
    index: HashMap<ItemKey, usize>,
}

impl<T, M: Matcher<T>> Column<T, M> {
    fn new() -> Self {
        Column {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn add(
        &mut self,
        rule: Rc<Rule<T, M>>,
        dot: usize,
        origin: usize,
        quant: QuantState,
        partial: Partial,
    ) -> usize {
        let key = ItemKey {
            rule_id: rule.id,
            dot,
            origin,
            quant,
        };
        if let Some(&idx) = self.index.get(&key) {
            let item = &mut self.items[idx];
            if !item.derivations.contains(&partial) {
                item.derivations.push(partial);
            }
            idx
        } else {
            let idx = self.items.len();
            self.index.insert(key, idx);
            self.items.push(Item {
                rule,
                dot,
                origin,
                quant,
                derivations: vec![partial],
            });
            idx
        }
    }
}

/// The whole chart: one column per token position, 0..=tokens.len().
pub struct Chart<T, M: Matcher<T>> {
    pub columns: Vec<Column<T, M>>,
}

impl<T, M: Matcher<T>> Chart<T, M> {
    /// Completed items at the last column whose head is `start` and whose
    /// origin is 0 -- the accepting items.
    pub fn accepting_items(&self, start: &str) -> Vec<ItemRef> {
        let last = self.columns.len() - 1;
        self.columns[last]
            .items
            .iter()
            .enumerate()
            .filter(|(_, it)| it.is_complete() && it.origin == 0 && it.rule.head == start)
            .map(|(index, _)| ItemRef {
                column: last,
                index,
            })
            .collect()
    }

    pub fn item(&self, r: ItemRef) -> &Item<T, M> {
        &self.columns[r.column].items[r.index]
    }

    /// The rightmost column that any item reached -- a reasonable "this is
    /// as far as the input could be understood" location for a no-parse
    /// error.
    pub fn furthest_position(&self) -> usize {
        self.columns
            .iter()
            .enumerate()
            .rev()
            .find(|(_, c)| !c.items.is_empty())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Non-terminal heads expected at `column` by some unfinished item,
    /// excluding `grammar`-anonymous heads. Used to build a no-parse
    /// message; order follows item discovery order and is deduplicated.
    pub fn expected_heads(&self, column: usize, grammar: &dyn RuleSet<T, M>) -> Vec<String> {
        let mut seen = Vec::new();
        for item in &self.columns[column].items {
            if let Some(Symbol::NonTerminal { head, .. }) = item.symbol_under_dot() {
                if !grammar.is_anonymous(head) && !seen.contains(head) {
                    seen.push(head.clone());
                }
            }
        }
        seen
    }

    /// Terminal descriptions (via [`Matcher::describe`]) expected at
    /// `column` by some unfinished item, deduplicated in discovery order.
    pub fn expected_terminals(&self, column: usize) -> Vec<String> {
        let mut seen = Vec::new();
        for item in &self.columns[column].items {
            if let Some(Symbol::Terminal { matcher, .. }) = item.symbol_under_dot() {
                let d = matcher.describe();
                if !seen.contains(&d) {
                    seen.push(d);
                }
            }
        }
        seen
    }
}

enum Matched {
    Token(usize),
    Sub(ItemRef),
}

impl Matched {
    fn as_slot(&self) -> SlotValue {
        match self {
            Matched::Token(i) => SlotValue::Token(*i),
            Matched::Sub(r) => SlotValue::Sub(*r),
        }
    }

    fn as_multi(&self) -> MultiSlot {
        match self {
            Matched::Token(i) => MultiSlot::Token(*i),
            Matched::Sub(r) => MultiSlot::Sub(*r),
        }
    }
}

/// A waiting item snapshotted out of a column, ready to be advanced by
/// [`apply_match`] without holding a borrow of that column.
type WaitingItem<T, M> = (Rc<Rule<T, M>>, usize, usize, QuantState, Vec<Partial>);

/// Advances one item past a successful match of its symbol-under-dot,
/// producing the (dot, state) transition and new partial derivations that
/// the quantifier on that symbol calls for, and adds the result to
/// `target`.
fn apply_match<T, M: Matcher<T>>(
    target: &mut Column<T, M>,
    target_col: usize,
    waiting: &WaitingItem<T, M>,
    matched: &Matched,
) {
    let (rule, dot, origin, quant, derivations) = waiting;
    let (dot, origin, quant) = (*dot, *origin, *quant);
    let quantifier = rule.rhs[dot].quantifier();
    for old in derivations {
        match (quant, quantifier) {
            (QuantState::Before, None) | (QuantState::Before, Some(Quantifier::Optional)) => {
                let mut slots = old.slots.clone();
                slots.push(matched.as_slot());
                let idx = target.add(
                    rule.clone(),
                    dot + 1,
                    origin,
                    QuantState::Before,
                    Partial {
                        slots,
                        pending: Vec::new(),
                    },
                );
                trace!(
                    "match: {} -> dot {} at column {} (item {})",
                    rule.head,
                    dot + 1,
                    target_col,
                    idx
                );
            }
            (QuantState::Before, Some(Quantifier::Star))
            | (QuantState::Before, Some(Quantifier::Plus)) => {
                let idx = target.add(
                    rule.clone(),
                    dot,
                    origin,
                    QuantState::Inside,
                    Partial {
                        slots: old.slots.clone(),
                        pending: vec![matched.as_multi()],
                    },
                );
                trace!(
                    "enter group: {} dot {} at column {} (item {})",
                    rule.head,
                    dot,
                    target_col,
                    idx
                );
            }
            (QuantState::Inside, Some(Quantifier::Star))
            | (QuantState::Inside, Some(Quantifier::Plus)) => {
                let mut pending = old.pending.clone();
                pending.push(matched.as_multi());
                let idx = target.add(
                    rule.clone(),
                    dot,
                    origin,
                    QuantState::Inside,
                    Partial {
                        slots: old.slots.clone(),
                        pending,
                    },
                );
                trace!(
                    "continue group: {} dot {} at column {} (item {})",
                    rule.head,
                    dot,
                    target_col,
                    idx
                );
            }
            (QuantState::Inside, None) | (QuantState::Inside, Some(Quantifier::Optional)) => {
                unreachable!("plain/optional symbols never enter the Inside state")
            }
        }
    }
}

/// Epsilon (zero-width) transitions available purely from an item's
/// quantifier/state, independent of any match: skipping an optional/star
/// symbol entirely, or leaving a star/plus group that has already matched.
fn apply_epsilon<T, M: Matcher<T>>(column: &mut Column<T, M>, column_index: usize, item_index: usize) {
    let (rule, dot, origin, quant, derivations) = {
        let item = &column.items[item_index];
        (
            item.rule.clone(),
            item.dot,
            item.origin,
            item.quant,
            item.derivations.clone(),
        )
    };
    let quantifier = rule.rhs[dot].quantifier();
    match (quant, quantifier) {
        (QuantState::Before, Some(Quantifier::Optional)) | (QuantState::Before, Some(Quantifier::Star)) => {
            for old in &derivations {
                let mut slots = old.slots.clone();
                slots.push(if quantifier == Some(Quantifier::Optional) {
                    SlotValue::Skipped
                } else {
                    SlotValue::Multiple(Vec::new())
                });
                let idx = column.add(
                    rule.clone(),
                    dot + 1,
                    origin,
                    QuantState::Before,
                    Partial {
                        slots,
                        pending: Vec::new(),
                    },
                );
                trace!(
                    "skip: {} -> dot {} at column {} (item {})",
                    rule.head,
                    dot + 1,
                    column_index,
                    idx
                );
            }
        }
        (QuantState::Inside, Some(Quantifier::Star)) | (QuantState::Inside, Some(Quantifier::Plus)) => {
            for old in &derivations {
                let mut slots = old.slots.clone();
                slots.push(SlotValue::Multiple(old.pending.clone()));
                let idx = column.add(
                    rule.clone(),
                    dot + 1,
                    origin,
                    QuantState::Before,
                    Partial {
                        slots,
                        pending: Vec::new(),
                    },
                );
                trace!(
                    "leave group: {} -> dot {} at column {} (item {})",
                    rule.head,
                    dot + 1,
                    column_index,
                    idx
                );
            }
        }
        _ => {}
    }
}

/// Runs predict/complete/epsilon-quantifier transitions at column `e` to a
/// fixed point. Must be called after column `e` has received its initial
/// (predicted or scanned-in) items and before column `e + 1` is scanned.
fn close_column<T, M: Matcher<T>>(chart: &mut Chart<T, M>, grammar: &dyn RuleSet<T, M>, e: usize) {
    let mut i = 0;
    while i < chart.columns[e].items.len() {
        let rule = chart.columns[e].items[i].rule.clone();
        let dot = chart.columns[e].items[i].dot;
        let origin = chart.columns[e].items[i].origin;

        if dot == rule.rhs.len() {
            let head = rule.head.clone();
            let waiting: Vec<WaitingItem<T, M>> = chart.columns[origin]
                .items
                .iter()
                .filter(|w| {
                    w.dot < w.rule.rhs.len()
                        && matches!(&w.rule.rhs[w.dot], Symbol::NonTerminal { head: h, .. } if h == &head)
                })
                .map(|w| (w.rule.clone(), w.dot, w.origin, w.quant, w.derivations.clone()))
                .collect();
            let matched = Matched::Sub(ItemRef { column: e, index: i });
            for item in &waiting {
                apply_match(&mut chart.columns[e], e, item, &matched);
            }
        } else if let Symbol::NonTerminal { head, .. } = &rule.rhs[dot] {
            for r in grammar.rules_for(head) {
                chart.columns[e].add(r.clone(), 0, e, QuantState::Before, Partial::empty());
            }
            apply_epsilon(&mut chart.columns[e], e, i);
        } else {
            apply_epsilon(&mut chart.columns[e], e, i);
        }
        i += 1;
    }
}

/// Consumes `tokens[e]` against every item in column `e` whose
/// symbol-under-dot is a matching terminal, adding the transitioned items to
/// column `e + 1`.
fn scan_column<T, M: Matcher<T>>(chart: &mut Chart<T, M>, tokens: &[T], e: usize) {
    let token = &tokens[e];
    let candidates: Vec<WaitingItem<T, M>> = chart.columns[e]
        .items
        .iter()
        .filter_map(|it| {
            if it.dot < it.rule.rhs.len() {
                if let Symbol::Terminal { matcher, .. } = &it.rule.rhs[it.dot] {
                    if matcher.matches(token) {
                        return Some((
                            it.rule.clone(),
                            it.dot,
                            it.origin,
                            it.quant,
                            it.derivations.clone(),
                        ));
                    }
                }
            }
            None
        })
        .collect();
    let (left, right) = chart.columns.split_at_mut(e + 1);
    let _ = left;
    let target = &mut right[0];
    for item in &candidates {
        apply_match(target, e + 1, item, &Matched::Token(e));
    }
}

/// Builds the full chart for `tokens` against `grammar`'s `start` rules.
pub fn recognize<T, M: Matcher<T>>(
    grammar: &dyn RuleSet<T, M>,
    start: &str,
    tokens: &[T],
) -> Chart<T, M> {
    let n = tokens.len();
    let mut chart = Chart {
        columns: (0..=n).map(|_| Column::new()).collect(),
    };
    for rule in grammar.rules_for(start) {
        chart.columns[0].add(rule.clone(), 0, 0, QuantState::Before, Partial::empty());
    }
    for e in 0..=n {
        close_column(&mut chart, grammar, e);
        trace!("column {} closed with {} items", e, chart.columns[e].items.len());
        if e < n {
            scan_column(&mut chart, tokens, e);
        }
    }
    chart
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Grammar;

    #[derive(Clone)]
    struct Exact(char);
    impl Matcher<char> for Exact {
        fn matches(&self, t: &char) -> bool {
            *t == self.0
        }
    }

    fn tok(chars: &str) -> Vec<char> {
        chars.chars().collect()
    }

    #[test]
    fn plain_sequence_accepts() {
        let mut g: Grammar<char, Exact> = Grammar::new();
        g.add_rule(
            "s",
            vec![
                Symbol::terminal(Exact('a')),
                Symbol::terminal(Exact('b')),
            ],
        );
        let chart = recognize(&g, "s", &tok("ab"));
        assert_eq!(chart.accepting_items("s").len(), 1);
    }

    #[test]
    fn plain_sequence_rejects_wrong_input() {
        let mut g: Grammar<char, Exact> = Grammar::new();
        g.add_rule(
            "s",
            vec![Symbol::terminal(Exact('a')), Symbol::terminal(Exact('b'))],
        );
        let chart = recognize(&g, "s", &tok("ac"));
        assert!(chart.accepting_items("s").is_empty());
    }

    #[test]
    fn optional_matches_zero_or_one() {
        let mut g: Grammar<char, Exact> = Grammar::new();
        g.add_rule(
            "s",
            vec![Symbol::terminal(Exact('a')).optional(), Symbol::terminal(Exact('b'))],
        );
        assert_eq!(recognize(&g, "s", &tok("b")).accepting_items("s").len(), 1);
        assert_eq!(recognize(&g, "s", &tok("ab")).accepting_items("s").len(), 1);
        assert!(recognize(&g, "s", &tok("aab")).accepting_items("s").is_empty());
    }

    #[test]
    fn star_matches_any_count() {
        let mut g: Grammar<char, Exact> = Grammar::new();
        g.add_rule("s", vec![Symbol::terminal(Exact('a')).star()]);
        assert_eq!(recognize(&g, "s", &tok("")).accepting_items("s").len(), 1);
        assert_eq!(recognize(&g, "s", &tok("aaaa")).accepting_items("s").len(), 1);
        assert!(recognize(&g, "s", &tok("aaab")).accepting_items("s").is_empty());
    }

    #[test]
    fn plus_requires_at_least_one() {
        let mut g: Grammar<char, Exact> = Grammar::new();
        g.add_rule("s", vec![Symbol::terminal(Exact('a')).plus()]);
        assert!(recognize(&g, "s", &tok("")).accepting_items("s").is_empty());
        assert_eq!(recognize(&g, "s", &tok("aaa")).accepting_items("s").len(), 1);
    }

    #[test]
    fn nonterminal_star_with_nullable_alternative() {
        // s -> x*; x -> 'a'
        let mut g: Grammar<char, Exact> = Grammar::new();
        g.add_rule("s", vec![Symbol::nonterminal("x").star()]);
        g.add_rule("x", vec![Symbol::terminal(Exact('a'))]);
        assert_eq!(recognize(&g, "s", &tok("aaa")).accepting_items("s").len(), 1);
        assert_eq!(recognize(&g, "s", &tok("")).accepting_items("s").len(), 1);
    }

    #[test]
    fn ambiguous_grammar_produces_multiple_derivations() {
        // s -> s s | 'a'
        let mut g: Grammar<char, Exact> = Grammar::new();
        g.add_rule(
            "s",
            vec![Symbol::nonterminal("s"), Symbol::nonterminal("s")],
        );
        g.add_rule("s", vec![Symbol::terminal(Exact('a'))]);
        let chart = recognize(&g, "s", &tok("aaa"));
        let accepting = chart.accepting_items("s");
        assert_eq!(accepting.len(), 1);
        let item = chart.item(accepting[0]);
        // "aaa" via s->s s has two distinct bracketings: a(aa) and (aa)a.
        assert!(item.derivations.len() >= 2);
    }
}
