use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::ops::{AddAssign, Index};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::Error;

const MOD: u128 = 3817949514078926267; // A prime number with 62 bits.
const BASE: u128 = 211;
const POW_BASE: [u128; 10] = get_powers_of_base();

const fn get_powers_of_base() -> [u128; 10] {
    let mut ret: [u128; 10] = [0; 10];
    ret[0] = 1;

    let mut i = 1;
    while i < ret.len() {
        ret[i] = ret[i - 1] * BASE % MOD;
        i += 1;
    }

    ret
}

/// The ten blackjack ranks. Jacks, queens and kings are folded into `Ten`.
/// The discriminant is the hard value of the card (Ace counts 1).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, Serialize, Deserialize,
)]
pub enum Rank {
    Ace = 1,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
}

impl Rank {
    /// Hard value of the card, Ace counted as 1.
    pub fn value(self) -> u16 {
        self as u16
    }

    fn index(self) -> usize {
        (self as usize) - 1
    }

    pub fn to_char(self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Ten => 'T',
            other => char::from(b'0' + other as u8),
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

impl TryFrom<char> for Rank {
    type Error = Error;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        let rank = match c.to_ascii_uppercase() {
            'A' | '1' => Rank::Ace,
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' | 'J' | 'Q' | 'K' | '0' => Rank::Ten,
            _ => return Err(Error::InvalidCard(c)),
        };
        Ok(rank)
    }
}

/// This provides a container to store the numbers of each rank. Hands, shoes
/// and discard piles are all `CardCount`s.
///
/// A polynomial hash of the counts is maintained incrementally so that using a
/// `CardCount` inside a memo key costs one word to hash. Equality still
/// compares the full count vector.
#[derive(Clone, Debug)]
pub struct CardCount {
    counts: [u16; 10],
    hash_value: u128,
    sum: u32,
    total: u16,
}

impl CardCount {
    /// Counts are ordered by rank value: Ace first, Ten last.
    pub fn new(counts: &[u16; 10]) -> CardCount {
        let mut card_count = CardCount {
            counts: *counts,
            hash_value: 0,
            sum: 0,
            total: 0,
        };

        card_count.propagate_counts();

        card_count
    }

    pub fn empty() -> CardCount {
        Self::new(&[0; 10])
    }

    pub fn with_number_of_decks(number_of_decks: u8) -> CardCount {
        let mut counts = [number_of_decks as u16 * 4; 10];
        counts[Rank::Ten.index()] = number_of_decks as u16 * 16;
        Self::new(&counts)
    }

    pub fn from_ranks(ranks: &[Rank]) -> CardCount {
        let mut card_count = Self::empty();
        for &rank in ranks {
            card_count.add_card(rank);
        }
        card_count
    }

    pub fn add_card(&mut self, rank: Rank) {
        let index = rank.index();
        self.counts[index] += 1;
        self.hash_value = (self.hash_value + POW_BASE[index]) % MOD;
        self.sum += u32::from(rank.value());
        self.total += 1;
    }

    /// Panics if there is no card of the given rank left.
    pub fn remove_card(&mut self, rank: Rank) {
        let index = rank.index();
        assert!(
            self.counts[index] > 0,
            "cannot remove {} from {}: none left",
            rank,
            self
        );
        self.counts[index] -= 1;
        self.hash_value = (self.hash_value + MOD - POW_BASE[index]) % MOD;
        self.sum -= u32::from(rank.value());
        self.total -= 1;
    }

    /// Note that this method treats Ace as 1.
    pub fn get_sum(&self) -> u32 {
        self.sum
    }

    pub fn get_total(&self) -> u16 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn has_ace(&self) -> bool {
        self[Rank::Ace] > 0
    }

    /// Returns the rank when the cards are exactly two of the same rank.
    pub fn is_pair(&self) -> Option<Rank> {
        if self.total != 2 {
            return None;
        }
        Rank::iter().find(|&rank| self[rank] == 2)
    }

    /// Ranks present in this multiset, each with its count.
    pub fn iter(&self) -> impl Iterator<Item = (Rank, u16)> + '_ {
        Rank::iter()
            .map(move |rank| (rank, self[rank]))
            .filter(|&(_, count)| count > 0)
    }

    fn propagate_counts(&mut self) {
        self.hash_value = 0;
        self.sum = 0;
        self.total = 0;
        for rank in Rank::iter() {
            let count = self.counts[rank.index()];
            self.hash_value += (count as u128) * POW_BASE[rank.index()];
            self.sum += u32::from(rank.value()) * u32::from(count);
            self.total += count;
        }
        self.hash_value %= MOD;
    }
}

impl Default for CardCount {
    fn default() -> Self {
        Self::empty()
    }
}

impl AddAssign<&CardCount> for CardCount {
    fn add_assign(&mut self, rhs: &CardCount) {
        for i in 0..self.counts.len() {
            self.counts[i] += rhs.counts[i];
        }

        self.hash_value = (self.hash_value + rhs.hash_value) % MOD;
        self.total += rhs.total;
        self.sum += rhs.sum;
    }
}

impl Index<Rank> for CardCount {
    type Output = u16;
    fn index(&self, rank: Rank) -> &Self::Output {
        &self.counts[rank.index()]
    }
}

impl Hash for CardCount {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u128(self.hash_value);
    }
}

impl PartialEq for CardCount {
    fn eq(&self, other: &Self) -> bool {
        self.counts == other.counts
    }
}

impl Eq for CardCount {}

/// Cards are written highest first, aces leading: `AT6`.
impl fmt::Display for CardCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "empty");
        }
        let order = std::iter::once(Rank::Ace)
            .chain(Rank::iter().rev().filter(|&rank| rank != Rank::Ace));
        for rank in order {
            for _ in 0..self[rank] {
                write!(f, "{}", rank)?;
            }
        }
        Ok(())
    }
}

impl FromStr for CardCount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut card_count = CardCount::empty();
        for c in s.chars().filter(|c| !c.is_whitespace() && *c != ',') {
            card_count.add_card(Rank::try_from(c)?);
        }
        Ok(card_count)
    }
}

/// Memo table keyed by any structural key built from `CardCount`s.
#[derive(Debug, Clone)]
pub struct StateArray<K: Eq + Hash, V> {
    data: HashMap<K, V>,
}

impl<K: Eq + Hash, V> StateArray<K, V> {
    pub fn new() -> StateArray<K, V> {
        StateArray {
            data: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.data.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<K: Eq + Hash, V> Default for StateArray<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
