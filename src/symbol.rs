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

//! Grammar symbols: terminals and non-terminals, with optional regex-like
//! quantifiers and ambiguity-preference flags attached to each right-hand-side
//! position.

use std::marker::PhantomData;

/// Capability a terminal symbol needs: can it match a given token?
///
/// Kept distinct from `PartialEq`/`Hash` on purpose -- tokens coming out of a
/// lexer are rarely comparable for equality in any useful sense (think
/// "number with this literal value" vs. "any number"), so matching is left to
/// the client.
pub trait Matcher<T> {
    fn matches(&self, token: &T) -> bool;

    /// Human-readable name for error messages (e.g. `NoParseError`'s
    /// `expected_terminals`). Terminal kinds are otherwise opaque to this
    /// crate, so the default is a placeholder; override it to get anything
    /// more useful than "a terminal was expected here".
    fn describe(&self) -> String {
        "<terminal>".to_string()
    }
}

/// Quantifier attached to a right-hand-side symbol. `None` means "exactly
/// once", the plain, unquantified case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    Optional,
    Star,
    Plus,
}

impl Quantifier {
    /// Whether this quantifier accepts zero occurrences.
    pub fn allows_zero(self) -> bool {
        matches!(self, Quantifier::Optional | Quantifier::Star)
    }

    /// Whether this quantifier accepts more than one occurrence.
    pub fn allows_repeat(self) -> bool {
        matches!(self, Quantifier::Star | Quantifier::Plus)
    }
}

/// Ambiguity-resolution hints attached to a quantified symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Preference {
    pub greedy: bool,
    pub lazy: bool,
    pub prefer_early: bool,
    pub prefer_late: bool,
}

impl Preference {
    fn validate(&self, quantifier: Option<Quantifier>) {
        assert!(
            !(self.greedy && self.lazy),
            "a symbol cannot be both greedy and lazy"
        );
        assert!(
            !(self.prefer_early && self.prefer_late),
            "a symbol cannot be both prefer_early and prefer_late"
        );
        if self.greedy || self.lazy {
            assert!(
                quantifier.is_some(),
                "greedy/lazy only make sense on a quantified symbol"
            );
        }
    }
}

/// A single symbol on a rule's right-hand side.
#[derive(Debug)]
pub enum Symbol<T, M: Matcher<T>> {
    Terminal {
        matcher: M,
        quantifier: Option<Quantifier>,
        preference: Preference,
        _token: PhantomData<fn(&T)>,
    },
    NonTerminal {
        head: String,
        quantifier: Option<Quantifier>,
        preference: Preference,
    },
}

impl<T, M: Matcher<T>> Symbol<T, M> {
    pub fn terminal(matcher: M) -> Self {
        Symbol::Terminal {
            matcher,
            quantifier: None,
            preference: Preference::default(),
            _token: PhantomData,
        }
    }

    pub fn nonterminal(head: impl Into<String>) -> Self {
        Symbol::NonTerminal {
            head: head.into(),
            quantifier: None,
            preference: Preference::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal { .. })
    }

    pub fn quantifier(&self) -> Option<Quantifier> {
        match self {
            Symbol::Terminal { quantifier, .. } => *quantifier,
            Symbol::NonTerminal { quantifier, .. } => *quantifier,
        }
    }

    pub fn preference(&self) -> Preference {
        match self {
            Symbol::Terminal { preference, .. } => *preference,
            Symbol::NonTerminal { preference, .. } => *preference,
        }
    }

    pub fn head(&self) -> Option<&str> {
        match self {
            Symbol::NonTerminal { head, .. } => Some(head.as_str()),
            Symbol::Terminal { .. } => None,
        }
    }

    pub fn matcher(&self) -> Option<&M> {
        match self {
            Symbol::Terminal { matcher, .. } => Some(matcher),
            Symbol::NonTerminal { .. } => None,
        }
    }

    fn set_quantifier(mut self, q: Quantifier) -> Self {
        match &mut self {
            Symbol::Terminal { quantifier, .. } | Symbol::NonTerminal { quantifier, .. } => {
                assert!(quantifier.is_none(), "symbol already has a quantifier");
                *quantifier = Some(q);
            }
        }
        self
    }

    pub fn optional(self) -> Self {
        self.set_quantifier(Quantifier::Optional)
    }

    pub fn star(self) -> Self {
        self.set_quantifier(Quantifier::Star)
    }

    pub fn plus(self) -> Self {
        self.set_quantifier(Quantifier::Plus)
    }

    fn with_preference(mut self, f: impl FnOnce(&mut Preference)) -> Self {
        let (pref, quant) = match &mut self {
            Symbol::Terminal {
                preference,
                quantifier,
                ..
            }
            | Symbol::NonTerminal {
                preference,
                quantifier,
                ..
            } => (preference, *quantifier),
        };
        f(pref);
        pref.validate(quant);
        self
    }

    pub fn greedy(self) -> Self {
        self.with_preference(|p| p.greedy = true)
    }

    pub fn lazy(self) -> Self {
        self.with_preference(|p| p.lazy = true)
    }

    pub fn prefer_early(self) -> Self {
        self.with_preference(|p| p.prefer_early = true)
    }

    pub fn prefer_late(self) -> Self {
        self.with_preference(|p| p.prefer_late = true)
    }
}

// Manual impls: `derive` would require `T: Clone`/`M: Clone` which we don't
// need and don't want to force on callers.
impl<T, M: Matcher<T> + Clone> Clone for Symbol<T, M> {
    fn clone(&self) -> Self {
        match self {
            Symbol::Terminal {
                matcher,
                quantifier,
                preference,
                ..
            } => Symbol::Terminal {
                matcher: matcher.clone(),
                quantifier: *quantifier,
                preference: *preference,
                _token: PhantomData,
            },
            Symbol::NonTerminal {
                head,
                quantifier,
                preference,
            } => Symbol::NonTerminal {
                head: head.clone(),
                quantifier: *quantifier,
                preference: *preference,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exact(char);
    impl Matcher<char> for Exact {
        fn matches(&self, token: &char) -> bool {
            *token == self.0
        }
    }

    #[test]
    fn plain_terminal_has_no_quantifier() {
        let s: Symbol<char, Exact> = Symbol::terminal(Exact('a'));
        assert!(s.quantifier().is_none());
        assert!(s.is_terminal());
    }

    #[test]
    fn star_allows_zero_and_repeat() {
        let s: Symbol<char, Exact> = Symbol::terminal(Exact('a')).star().greedy();
        assert_eq!(s.quantifier(), Some(Quantifier::Star));
        assert!(s.quantifier().unwrap().allows_zero());
        assert!(s.quantifier().unwrap().allows_repeat());
        assert!(s.preference().greedy);
    }

    #[test]
    fn plus_does_not_allow_zero() {
        let s: Symbol<char, Exact> = Symbol::terminal(Exact('a')).plus();
        assert!(!s.quantifier().unwrap().allows_zero());
        assert!(s.quantifier().unwrap().allows_repeat());
    }

    #[test]
    #[should_panic(expected = "cannot be both greedy and lazy")]
    fn greedy_and_lazy_conflict() {
        let _: Symbol<char, Exact> = Symbol::terminal(Exact('a')).star().greedy().lazy();
    }

    #[test]
    #[should_panic(expected = "only make sense on a quantified symbol")]
    fn greedy_requires_quantifier() {
        let _: Symbol<char, Exact> = Symbol::terminal(Exact('a')).greedy();
    }
}
