use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt;

/// One end of an interval. Infinite bounds are always exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub inclusive: bool,
}

impl Bound {
    pub const NEG_INFINITY: Bound = Bound {
        value: f64::NEG_INFINITY,
        inclusive: false,
    };
    pub const INFINITY: Bound = Bound {
        value: f64::INFINITY,
        inclusive: false,
    };

    pub fn new(value: f64, inclusive: bool) -> Self {
        Self {
            value,
            inclusive: inclusive && value.is_finite(),
        }
    }

    pub fn inclusive(value: f64) -> Self {
        Self::new(value, true)
    }

    pub fn exclusive(value: f64) -> Self {
        Self::new(value, false)
    }

    pub fn is_finite(&self) -> bool {
        self.value.is_finite()
    }

    /// Bound used for integer intervals: finite ends are always inclusive.
    fn integer(value: f64) -> Self {
        Self::new(value, true)
    }
}

/// `a` is at most as restrictive as `b` when both are lower bounds.
fn lower_le(a: Bound, b: Bound) -> bool {
    a.value < b.value || (a.value == b.value && (a.inclusive || !b.inclusive))
}

/// `a` is at most as restrictive as `b` when both are upper bounds.
fn upper_ge(a: Bound, b: Bound) -> bool {
    a.value > b.value || (a.value == b.value && (a.inclusive || !b.inclusive))
}

fn tighter_lower(a: Bound, b: Bound) -> Bound {
    if lower_le(a, b) { b } else { a }
}

fn tighter_upper(a: Bound, b: Bound) -> Bound {
    if upper_ge(a, b) { b } else { a }
}

fn looser_lower(a: Bound, b: Bound) -> Bound {
    if lower_le(a, b) { a } else { b }
}

fn looser_upper(a: Bound, b: Bound) -> Bound {
    if upper_ge(a, b) { a } else { b }
}

/// A contiguous range of real numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: Bound,
    pub max: Bound,
}

impl Interval {
    pub fn new(min: Bound, max: Bound) -> Self {
        Self { min, max }
    }

    pub fn point(value: f64) -> Self {
        Self::new(Bound::inclusive(value), Bound::inclusive(value))
    }

    pub fn unbounded() -> Self {
        Self::new(Bound::NEG_INFINITY, Bound::INFINITY)
    }

    pub fn is_empty(&self) -> bool {
        self.min.value.is_nan()
            || self.max.value.is_nan()
            || self.min.value > self.max.value
            || (self.min.value == self.max.value && !(self.min.inclusive && self.max.inclusive))
    }

    pub fn is_point(&self) -> bool {
        !self.is_empty() && self.min.value == self.max.value
    }

    pub fn contains(&self, other: &Interval) -> bool {
        lower_le(self.min, other.min) && upper_ge(self.max, other.max)
    }

    pub fn contains_value(&self, value: f64) -> bool {
        self.contains(&Interval::point(value))
    }

    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let result = Interval::new(
            tighter_lower(self.min, other.min),
            tighter_upper(self.max, other.max),
        );
        (!result.is_empty()).then_some(result)
    }

    /// True when the union of the two intervals is itself a single interval.
    fn connects(&self, other: &Interval) -> bool {
        let separated = |max: Bound, min: Bound| {
            max.value < min.value || (max.value == min.value && !max.inclusive && !min.inclusive)
        };
        !separated(self.max, other.min) && !separated(other.max, self.min)
    }

    /// Integer intervals connect when they overlap or are neighbours.
    fn connects_integers(&self, other: &Interval) -> bool {
        !(self.max.value + 1.0 < other.min.value) && !(other.max.value + 1.0 < self.min.value)
    }

    fn hull(&self, other: &Interval) -> Interval {
        Interval::new(
            looser_lower(self.min, other.min),
            looser_upper(self.max, other.max),
        )
    }

    /// The integers contained in this interval, as an integer interval.
    pub fn to_integers(&self) -> Option<Interval> {
        let min = if self.min.is_finite() {
            let mut value = self.min.value.ceil();
            if !self.min.inclusive && value == self.min.value {
                value += 1.0;
            }
            Bound::integer(value)
        } else {
            self.min
        };
        let max = if self.max.is_finite() {
            let mut value = self.max.value.floor();
            if !self.max.inclusive && value == self.max.value {
                value -= 1.0;
            }
            Bound::integer(value)
        } else {
            self.max
        };
        let result = Interval::new(min, max);
        (!result.is_empty()).then_some(result)
    }

    /// Removes the integers of `cover` from the integer interval `self`.
    fn subtract_integers(&self, cover: &Interval) -> Vec<Interval> {
        if self.intersect(cover).is_none() {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(2);
        if self.min.value < cover.min.value {
            let piece = Interval::new(self.min, Bound::integer(cover.min.value - 1.0));
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }
        if cover.max.value < self.max.value {
            let piece = Interval::new(Bound::integer(cover.max.value + 1.0), self.max);
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }
        pieces
    }

    fn negate(&self) -> Interval {
        Interval::new(
            Bound::new(-self.max.value, self.max.inclusive),
            Bound::new(-self.min.value, self.min.inclusive),
        )
    }

    fn add(&self, other: &Interval) -> Interval {
        Interval::new(
            Bound::new(
                self.min.value + other.min.value,
                self.min.inclusive && other.min.inclusive,
            ),
            Bound::new(
                self.max.value + other.max.value,
                self.max.inclusive && other.max.inclusive,
            ),
        )
    }

    fn multiply(&self, other: &Interval) -> Interval {
        // 0 * inf is taken as 0, which keeps products with unbounded ends sound.
        let product = |a: Bound, b: Bound| {
            if a.value == 0.0 {
                Bound::new(0.0, a.inclusive)
            } else if b.value == 0.0 {
                Bound::new(0.0, b.inclusive)
            } else {
                Bound::new(a.value * b.value, a.inclusive && b.inclusive)
            }
        };
        let corners = [
            product(self.min, other.min),
            product(self.min, other.max),
            product(self.max, other.min),
            product(self.max, other.max),
        ];
        let min = corners[1..]
            .iter()
            .fold(corners[0], |acc, b| looser_lower(acc, *b));
        let max = corners[1..]
            .iter()
            .fold(corners[0], |acc, b| looser_upper(acc, *b));
        Interval::new(min, max)
    }

    fn abs(&self) -> Interval {
        if lower_le(Bound::inclusive(0.0), self.min) {
            *self
        } else if upper_ge(Bound::inclusive(0.0), self.max) {
            self.negate()
        } else {
            let negated_min = Bound::new(-self.min.value, self.min.inclusive);
            Interval::new(Bound::inclusive(0.0), looser_upper(negated_min, self.max))
        }
    }

    fn minimum(&self, other: &Interval) -> Interval {
        Interval::new(
            looser_lower(self.min, other.min),
            tighter_upper(self.max, other.max),
        )
    }

    fn maximum(&self, other: &Interval) -> Interval {
        Interval::new(
            tighter_lower(self.min, other.min),
            looser_upper(self.max, other.max),
        )
    }
}

fn compare_min(a: &Interval, b: &Interval) -> Ordering {
    a.min
        .value
        .total_cmp(&b.min.value)
        .then_with(|| b.min.inclusive.cmp(&a.min.inclusive))
}

fn merge_with(mut intervals: Vec<Interval>, connects: fn(&Interval, &Interval) -> bool) -> Vec<Interval> {
    intervals.sort_by(compare_min);
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if connects(last, &interval) => *last = last.hull(&interval),
            _ => merged.push(interval),
        }
    }
    merged
}

/// A normalized set of numbers: maximal real intervals plus maximal integer
/// intervals that only cover integers outside the real intervals.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericSet {
    reals: Vec<Interval>,
    integers: Vec<Interval>,
}

impl NumericSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn all_reals() -> Self {
        Self::from_parts(vec![Interval::unbounded()], Vec::new())
    }

    pub fn all_integers() -> Self {
        Self::from_parts(Vec::new(), vec![Interval::unbounded()])
    }

    pub fn literal(value: f64) -> Self {
        Self::from_parts(vec![Interval::point(value)], Vec::new())
    }

    pub fn interval(interval: Interval) -> Self {
        Self::from_parts(vec![interval], Vec::new())
    }

    /// The integers inside `interval`.
    pub fn integers(interval: Interval) -> Self {
        Self::from_parts(Vec::new(), vec![interval])
    }

    pub fn from_parts(reals: Vec<Interval>, integers: Vec<Interval>) -> Self {
        let mut integers: Vec<Interval> = integers.iter().filter_map(Interval::to_integers).collect();
        let mut rest = Vec::with_capacity(reals.len());
        for interval in reals.into_iter().filter(|i| !i.is_empty()) {
            if interval.is_point() && interval.min.value.fract() == 0.0 {
                integers.push(interval);
            } else {
                rest.push(interval);
            }
        }

        let mut reals = merge_with(rest, Interval::connects);
        let integers = merge_with(integers, Interval::connects_integers);

        // An integer sitting on an exclusive end of a real interval closes that end.
        let mut absorbed = false;
        for real in &mut reals {
            for bound in [&mut real.min, &mut real.max] {
                if bound.is_finite()
                    && !bound.inclusive
                    && bound.value.fract() == 0.0
                    && integers.iter().any(|i| i.contains_value(bound.value))
                {
                    bound.inclusive = true;
                    absorbed = true;
                }
            }
        }
        if absorbed {
            reals = merge_with(reals, Interval::connects);
        }

        let mut remaining = integers;
        for real in &reals {
            if let Some(cover) = real.to_integers() {
                remaining = remaining
                    .iter()
                    .flat_map(|i| i.subtract_integers(&cover))
                    .collect();
            }
        }

        Self {
            reals,
            integers: merge_with(remaining, Interval::connects_integers),
        }
    }

    pub fn reals(&self) -> &[Interval] {
        &self.reals
    }

    pub fn integer_intervals(&self) -> &[Interval] {
        &self.integers
    }

    pub fn is_empty(&self) -> bool {
        self.reals.is_empty() && self.integers.is_empty()
    }

    pub fn is_all_reals(&self) -> bool {
        self.reals.len() == 1 && self.reals[0] == Interval::unbounded()
    }

    pub fn is_integral(&self) -> bool {
        self.reals.is_empty()
    }

    /// The single value of this set, if it holds exactly one number.
    pub fn as_literal(&self) -> Option<f64> {
        match (self.reals.as_slice(), self.integers.as_slice()) {
            ([only], []) | ([], [only]) if only.is_point() => Some(only.min.value),
            _ => None,
        }
    }

    fn parts(&self) -> impl Iterator<Item = (Interval, bool)> + '_ {
        self.reals
            .iter()
            .map(|i| (*i, false))
            .chain(self.integers.iter().map(|i| (*i, true)))
    }

    pub fn union(&self, other: &NumericSet) -> NumericSet {
        Self::from_parts(
            self.reals.iter().chain(&other.reals).copied().collect(),
            self.integers.iter().chain(&other.integers).copied().collect(),
        )
    }

    pub fn intersect(&self, other: &NumericSet) -> NumericSet {
        let mut reals = Vec::new();
        let mut integers = Vec::new();
        for ((a, a_int), (b, b_int)) in self.parts().cartesian_product(other.parts().collect_vec()) {
            if let Some(overlap) = a.intersect(&b) {
                if a_int || b_int {
                    integers.push(overlap);
                } else {
                    reals.push(overlap);
                }
            }
        }
        Self::from_parts(reals, integers)
    }

    /// True when every number of `other` is also in `self`.
    pub fn contains(&self, other: &NumericSet) -> bool {
        let reals_covered = other
            .reals
            .iter()
            .all(|r| self.reals.iter().any(|s| s.contains(r)));
        if !reals_covered {
            return false;
        }
        other.integers.iter().all(|i| {
            let mut uncovered = vec![*i];
            for real in &self.reals {
                if let Some(cover) = real.to_integers() {
                    uncovered = uncovered
                        .iter()
                        .flat_map(|piece| piece.subtract_integers(&cover))
                        .collect();
                }
            }
            uncovered
                .iter()
                .all(|piece| self.integers.iter().any(|s| s.contains(piece)))
        })
    }

    fn combine(&self, other: &NumericSet, op: fn(&Interval, &Interval) -> Interval) -> NumericSet {
        let mut reals = Vec::new();
        let mut integers = Vec::new();
        for ((a, a_int), (b, b_int)) in self.parts().cartesian_product(other.parts().collect_vec()) {
            let result = op(&a, &b);
            if a_int && b_int {
                integers.push(result);
            } else {
                reals.push(result);
            }
        }
        Self::from_parts(reals, integers)
    }

    fn map(&self, op: fn(&Interval) -> Interval) -> NumericSet {
        Self::from_parts(
            self.reals.iter().map(op).collect(),
            self.integers.iter().map(op).collect(),
        )
    }

    pub fn add(&self, other: &NumericSet) -> NumericSet {
        self.combine(other, Interval::add)
    }

    pub fn subtract(&self, other: &NumericSet) -> NumericSet {
        self.combine(&other.negate(), Interval::add)
    }

    pub fn multiply(&self, other: &NumericSet) -> NumericSet {
        self.combine(other, Interval::multiply)
    }

    pub fn negate(&self) -> NumericSet {
        self.map(Interval::negate)
    }

    pub fn abs(&self) -> NumericSet {
        self.map(Interval::abs)
    }

    pub fn minimum(&self, other: &NumericSet) -> NumericSet {
        self.combine(other, Interval::minimum)
    }

    pub fn maximum(&self, other: &NumericSet) -> NumericSet {
        self.combine(other, Interval::maximum)
    }
}

/// Formats a number the way it is written in source: integral values without a fraction.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_range(interval: &Interval) -> String {
    let min = if interval.min.is_finite() {
        format_number(interval.min.value)
    } else {
        String::new()
    };
    let max = if interval.max.is_finite() {
        format_number(interval.max.value)
    } else {
        String::new()
    };
    let open_min = if interval.min.is_finite() && !interval.min.inclusive { "<" } else { "" };
    let open_max = if interval.max.is_finite() && !interval.max.inclusive { "<" } else { "" };
    format!("{}{}..{}{}", min, open_min, open_max, max)
}

impl fmt::Display for NumericSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "never");
        }
        let integers = self.integers.iter().map(|i| {
            if i.is_point() {
                format_number(i.min.value)
            } else if *i == Interval::unbounded() {
                "int".to_string()
            } else {
                format!("int({})", format_range(i))
            }
        });
        let reals = self.reals.iter().map(|i| {
            if i.is_point() {
                format_number(i.min.value)
            } else {
                format_range(i)
            }
        });
        write!(f, "{}", integers.chain(reals).join(" | "))
    }
}
