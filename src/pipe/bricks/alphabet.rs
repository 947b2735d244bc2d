//! Letter substitution over a configurable alphabet.

use crate::chain::Chain;
use crate::pipe::error::{BrickError, BrickResult};

pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Ordered, distinct letters a substitution cipher works on.
///
/// When not case sensitive the letters are lowercased (and deduplicated
/// again); input letters are matched by their lowercase form and written
/// back with their original case.
#[derive(Debug, Clone)]
pub struct Alphabet {
    letters: Vec<char>,
    case_sensitive: bool,
}

impl Alphabet {
    pub fn new(alphabet: &Chain, case_sensitive: bool) -> BrickResult<Self> {
        let letters: Vec<char> = if case_sensitive {
            Chain::empty().extend(alphabet)?.string()?.chars().collect()
        } else {
            let lower = alphabet.to_lower_case()?;
            Chain::empty().extend(&lower)?.string()?.chars().collect()
        };
        if letters.len() < 2 {
            return Err(BrickError::invalid_input(
                "The alphabet needs at least two distinct letters",
            ));
        }
        Ok(Self {
            letters,
            case_sensitive,
        })
    }

    pub fn len(&self) -> usize {
        self.letters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    pub fn letter(&self, index: usize) -> char {
        self.letters[index % self.letters.len()]
    }

    /// Index of `c`, honouring case sensitivity.
    pub fn index_of(&self, c: char) -> Option<usize> {
        let c = if self.case_sensitive { c } else { single_lower(c) };
        self.letters.iter().position(|&l| l == c)
    }

    /// Replace every alphabet letter in `content` by the letter at `map(index)`.
    ///
    /// `map` is only called for alphabet letters, in order. Other characters
    /// pass through unchanged.
    pub fn translate(
        &self,
        content: &Chain,
        mut map: impl FnMut(usize) -> usize,
    ) -> BrickResult<Chain> {
        let text = content.string()?;
        let mut output = String::with_capacity(text.len());
        for c in text.chars() {
            match self.index_of(c) {
                Some(index) => {
                    let mapped = self.letter(map(index));
                    if !self.case_sensitive && single_lower(c) != c {
                        output.push(single_upper(mapped));
                    } else {
                        output.push(mapped);
                    }
                }
                None => output.push(c),
            }
        }
        Ok(Chain::from_string_with_encoding(output, content.encoding()))
    }
}

fn single_lower(c: char) -> char {
    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        _ => c,
    }
}

fn single_upper(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

/// `value mod modulus`, always non-negative.
pub fn modulo(value: i64, modulus: usize) -> usize {
    value.rem_euclid(modulus as i64) as usize
}
