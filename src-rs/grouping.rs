//! Greedy filename clustering.
//!
//! Take the first unassigned item as a base, pull in every later item whose
//! name scores at or above the threshold against the base (in list order, up to
//! the group cap), and repeat. The result depends on input order on purpose:
//! two items that both resemble a third are only grouped together when that
//! third item is the base.

use crate::config::StitchOptions;
use crate::similarity::similarity;
use crate::source::ImageSource;
use std::collections::VecDeque;

/// Anything with a name that grouping can compare.
pub trait Named {
    fn name(&self) -> &str;
}

impl Named for ImageSource {
    fn name(&self) -> &str {
        ImageSource::name(self)
    }
}

impl Named for &str {
    fn name(&self) -> &str {
        self
    }
}

/// An ordered, non-empty cluster; the first member is the base.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<T = ImageSource> {
    members: Vec<T>,
}

impl<T: Named> Group<T> {
    pub fn members(&self) -> &[T] {
        &self.members
    }

    pub fn first(&self) -> &T {
        &self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; groups are never built empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    pub fn names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name().to_string()).collect()
    }

    pub fn into_members(self) -> Vec<T> {
        self.members
    }
}

/// Partition `items` into groups of at most `options.max_group_size`.
///
/// Every item lands in exactly one group. Groups come out in the order their
/// base was taken from the worklist.
pub fn group_sources<T: Named>(items: Vec<T>, options: &StitchOptions) -> Vec<Group<T>> {
    group_with(items, options.threshold, options.max_group_size)
}

pub fn group_with<T: Named>(items: Vec<T>, threshold: f64, max_group_size: usize) -> Vec<Group<T>> {
    let cap = max_group_size.max(1);
    let mut worklist: VecDeque<T> = items.into();
    let mut groups = Vec::new();

    while let Some(base) = worklist.pop_front() {
        let mut members = vec![base];
        let mut remaining = VecDeque::with_capacity(worklist.len());

        for candidate in worklist.drain(..) {
            if members.len() < cap && similarity(members[0].name(), candidate.name()) >= threshold {
                members.push(candidate);
            } else {
                remaining.push_back(candidate);
            }
        }

        worklist = remaining;
        groups.push(Group { members });
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(groups: &[Group<&'static str>]) -> Vec<Vec<&'static str>> {
        groups.iter().map(|g| g.members().to_vec()).collect()
    }

    fn group(items: &[&'static str]) -> Vec<Group<&'static str>> {
        group_sources(items.to_vec(), &StitchOptions::default())
    }

    #[test]
    fn adjacent_siblings_share_a_group() {
        let groups = group(&["photo1.png", "photo2.png"]);
        assert_eq!(names_of(&groups), vec![vec!["photo1.png", "photo2.png"]]);
    }

    #[test]
    fn single_input_is_a_singleton() {
        let groups = group(&["x.png"]);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].is_singleton());
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(group(&[]).is_empty());
    }

    #[test]
    fn group_size_is_capped_and_overflow_starts_a_new_group() {
        let items = [
            "img_1.png", "img_2.png", "img_3.png", "img_4.png", "img_5.png", "img_6.png",
        ];
        let groups = group(&items);
        assert_eq!(
            names_of(&groups),
            vec![
                vec!["img_1.png", "img_2.png", "img_3.png", "img_4.png"],
                vec!["img_5.png", "img_6.png"],
            ]
        );
        assert!(groups.iter().all(|g| g.len() <= 4));
    }

    #[test]
    fn unrelated_names_stay_apart_and_keep_base_order() {
        let groups = group(&["cat_1.png", "invoice.pdf.png", "cat_2.png", "zebra.gif"]);
        assert_eq!(
            names_of(&groups),
            vec![
                vec!["cat_1.png", "cat_2.png"],
                vec!["invoice.pdf.png"],
                vec!["zebra.gif"],
            ]
        );
    }

    // LEFT and RIGHT each share a 6-char block with HUB but only 4 with each other.
    const HUB: &str = "abcdefgh";
    const LEFT: &str = "abcdefXY";
    const RIGHT: &str = "XYcdefgh";

    #[test]
    fn fixture_relations_hold() {
        assert!(similarity(HUB, LEFT) >= 0.75);
        assert!(similarity(HUB, RIGHT) >= 0.75);
        assert!(similarity(LEFT, RIGHT) < 0.75);
    }

    #[test]
    fn grouping_depends_on_input_order() {
        // Hub first: both neighbours join it.
        assert_eq!(
            names_of(&group(&[HUB, LEFT, RIGHT])),
            vec![vec![HUB, LEFT, RIGHT]]
        );
        // LEFT as base only sees HUB; RIGHT is left on its own.
        assert_eq!(
            names_of(&group(&[LEFT, RIGHT, HUB])),
            vec![vec![LEFT, HUB], vec![RIGHT]]
        );
        assert_eq!(
            names_of(&group(&[LEFT, HUB, RIGHT])),
            vec![vec![LEFT, HUB], vec![RIGHT]]
        );
    }

    #[test]
    fn every_item_lands_in_exactly_one_group() {
        let items = [
            "a1.png", "b1.png", "a2.png", "c.png", "a3.png", "b2.png", "a4.png", "a5.png",
            "b3.png",
        ];
        let groups = group(&items);
        let mut seen: Vec<&str> = groups.iter().flat_map(|g| g.members().to_vec()).collect();
        seen.sort();
        let mut expected = items.to_vec();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[test]
    fn threshold_is_inclusive() {
        // "ab" vs "ac": 2 * 1 / 4 = 0.5
        let groups = group_with(vec!["ab", "ac"], 0.5, 4);
        assert_eq!(groups.len(), 1);
        let groups = group_with(vec!["ab", "ac"], 0.51, 4);
        assert_eq!(groups.len(), 2);
    }
}
