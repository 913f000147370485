//! Matching recorded subject names against curriculum names.
//!
//! Older mark records use drifting spellings ("English I", "Social Science",
//! "Maths"). Lookup never fails: a subject with no matching record is simply
//! treated as unrecorded.

use crate::calc::SubjectMark;

/// Spellings that name the same subject. Entries are normalized on use.
const ALIAS_GROUPS: &[&[&str]] = &[
    &["english", "english i", "eng-i"],
    &["english - ii", "english ii", "eng-ii"],
    &["social studies", "social science"],
    &["math", "maths", "mathematics"],
    &["spellings", "spelling"],
];

pub fn normalize(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = collapsed.replace(" - ", "-").replace(" -", "-").replace("- ", "-");
    while out.ends_with(|c: char| c == '.' || c == ':' || c == ' ') {
        out.pop();
    }
    out
}

fn alias_group(normalized: &str) -> Option<usize> {
    ALIAS_GROUPS
        .iter()
        .position(|group| group.iter().any(|alias| normalize(alias) == normalized))
}

pub fn matches(result_subject: &str, def_subject: &str) -> bool {
    let a = normalize(result_subject);
    let b = normalize(def_subject);
    if a == b {
        return true;
    }
    match (alias_group(&a), alias_group(&b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// First item whose name matches `wanted`. An exact (normalized) name wins
/// over an alias.
pub fn find_by_name<'a, T>(
    items: &'a [T],
    wanted: &str,
    name_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let normalized = normalize(wanted);
    items
        .iter()
        .find(|item| normalize(name_of(item)) == normalized)
        .or_else(|| items.iter().find(|item| matches(name_of(item), wanted)))
}

/// Recorded mark for a curriculum subject.
pub fn find_mark<'a>(results: &'a [SubjectMark], def_subject: &str) -> Option<&'a SubjectMark> {
    find_by_name(results, def_subject, |m| m.subject.as_str())
}
