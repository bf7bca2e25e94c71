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

//! Rules and rule sets.
//!
//! A [`Rule`] is a head plus a right-hand side of [`Symbol`]s, carrying a
//! non-negative penalty and a stable insertion-order id (used both for
//! identity comparisons and as the rank consulted by prefer-early/late
//! pruning). [`RuleSet`] is the lookup contract the recognizer depends on;
//! [`Grammar`] is the default, dynamically built implementation of it.

use std::collections::HashMap;
use std::collections::HashSet;
use std::rc::Rc;

pub use crate::symbol::{Matcher, Symbol};

pub type RuleId = u64;

/// One production: `head -> rhs`.
#[derive(Debug)]
pub struct Rule<T, M: Matcher<T>> {
    pub id: RuleId,
    pub head: String,
    pub rhs: Vec<Symbol<T, M>>,
    pub penalty: u32,
}

impl<T, M: Matcher<T>> Rule<T, M> {
    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }
}

/// Lookup contract the recognizer needs from a grammar.
///
/// Implementing this directly (rather than always going through [`Grammar`])
/// lets a caller plug in a grammar whose rules are computed on demand instead
/// of stored in a table, the same role `CompiledGrammar` plays for
/// compile-time grammars.
pub trait RuleSet<T, M: Matcher<T>> {
    /// All rules whose head is `head`, in insertion order.
    fn rules_for(&self, head: &str) -> &[Rc<Rule<T, M>>];

    /// Heads that should not appear in error messages (internal helper
    /// non-terminals introduced by the client). Defaults to "none".
    fn is_anonymous(&self, _head: &str) -> bool {
        false
    }
}

/// Dynamically built, table-backed [`RuleSet`].
pub struct Grammar<T, M: Matcher<T>> {
    rules: Vec<Rc<Rule<T, M>>>,
    by_head: HashMap<String, Vec<Rc<Rule<T, M>>>>,
    anonymous: HashSet<String>,
    next_id: RuleId,
    empty_slice: Vec<Rc<Rule<T, M>>>,
}

impl<T, M: Matcher<T>> Default for Grammar<T, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M: Matcher<T>> Grammar<T, M> {
    pub fn new() -> Self {
        Grammar {
            rules: Vec::new(),
            by_head: HashMap::new(),
            anonymous: HashSet::new(),
            next_id: 0,
            empty_slice: Vec::new(),
        }
    }

    /// Adds a rule with penalty 0. Returns the rule's id.
    pub fn add_rule(&mut self, head: impl Into<String>, rhs: Vec<Symbol<T, M>>) -> RuleId {
        self.add_rule_with_penalty(head, rhs, 0)
    }

    pub fn add_rule_with_penalty(
        &mut self,
        head: impl Into<String>,
        rhs: Vec<Symbol<T, M>>,
        penalty: u32,
    ) -> RuleId {
        let head = head.into();
        let id = self.next_id;
        self.next_id += 1;
        let rule = Rc::new(Rule {
            id,
            head: head.clone(),
            rhs,
            penalty,
        });
        self.rules.push(rule.clone());
        self.by_head.entry(head).or_default().push(rule);
        id
    }

    /// Marks `head` as anonymous: error messages about expectations at this
    /// head are suppressed (the client-facing grammar only ever sees the
    /// outer rule that referenced it).
    pub fn mark_anonymous(&mut self, head: impl Into<String>) {
        self.anonymous.insert(head.into());
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rc<Rule<T, M>>> {
        self.rules.iter().find(|r| r.id == id)
    }
}

impl<T, M: Matcher<T>> RuleSet<T, M> for Grammar<T, M> {
    fn rules_for(&self, head: &str) -> &[Rc<Rule<T, M>>] {
        self.by_head
            .get(head)
            .map(|v| v.as_slice())
            .unwrap_or(&self.empty_slice)
    }

    fn is_anonymous(&self, head: &str) -> bool {
        self.anonymous.contains(head)
    }
}
