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

//! Failure classification for a parse attempt.

use thiserror::Error;

use crate::builder::Tree;

/// Why a parse failed, with enough localisation to point a caller at the
/// offending span of the input.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no parse: {message} (at token {start_index}..{end_index})")]
    NoParse {
        message: String,
        start_index: usize,
        end_index: usize,
        /// Description of the token at `start_index`, or `None` if the input
        /// ended there (`start_index == end_index == token count`).
        encountered: Option<String>,
        /// Terminal descriptions (via [`crate::Matcher::describe`]) expected
        /// under the dot at `start_index`.
        expected_terminals: Vec<String>,
        /// `expected_terminals`, augmented with the heads of non-terminals
        /// predicted at `start_index` and not marked anonymous.
        expected: Vec<String>,
    },

    #[error("ambiguous parse: {message} (at token {start_index}..{end_index})")]
    AmbiguousParse {
        message: String,
        start_index: usize,
        end_index: usize,
        /// The leftmost ambiguous node's surviving alternatives, each folded
        /// as far as it can go without requiring further disambiguation.
        alternatives: Vec<Tree>,
    },

    #[error("infinite parse: {message} (at token {start_index}..{end_index})")]
    InfiniteParse {
        message: String,
        start_index: usize,
        end_index: usize,
    },
}

impl ParseError {
    pub fn start_index(&self) -> usize {
        match self {
            ParseError::NoParse { start_index, .. }
            | ParseError::AmbiguousParse { start_index, .. }
            | ParseError::InfiniteParse { start_index, .. } => *start_index,
        }
    }

    pub fn end_index(&self) -> usize {
        match self {
            ParseError::NoParse { end_index, .. }
            | ParseError::AmbiguousParse { end_index, .. }
            | ParseError::InfiniteParse { end_index, .. } => *end_index,
        }
    }
}
