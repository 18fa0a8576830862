use std::collections::HashMap;

use super::selection::sorted_by_score;
use super::types::{Candidate, FamilyBoardEntry};

/// `"neo-brutalist"` → `"Neo Brutalist"`.
pub fn title_case(value: &str) -> String {
    value
        .split(|c: char| c == '-' || c == '_' || c == '/' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"premium/swiss"` → `"Premium Swiss"`.
pub fn family_label(family_id: &str) -> String {
    let (vibe, era) = family_id.split_once('/').unwrap_or((family_id, ""));
    format!("{} {}", title_case(vibe), title_case(era))
        .trim()
        .to_string()
}

/// Group candidates by visual family, keep the best `variants_per_family` of
/// each, and order families by their best member.
pub fn build_family_board(candidates: &[Candidate], variants_per_family: usize) -> Vec<FamilyBoardEntry> {
    let variants = variants_per_family.max(1);

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<Candidate>> = HashMap::new();
    for candidate in candidates {
        let family = candidate.visual_family_id.as_str();
        groups
            .entry(family)
            .or_insert_with(|| {
                order.push(family);
                Vec::new()
            })
            .push(candidate.clone());
    }

    let mut board: Vec<FamilyBoardEntry> = order
        .into_iter()
        .filter_map(|family| {
            let members = groups.remove(family)?;
            let mut members = sorted_by_score(&members);
            members.truncate(variants);
            Some(FamilyBoardEntry {
                family_id: family.to_string(),
                label: family_label(family),
                candidates: members,
            })
        })
        .collect();

    let top_score = |entry: &FamilyBoardEntry| entry.candidates.first().map_or(0.0, |c| c.scores.score);
    board.sort_by(|a, b| top_score(b).total_cmp(&top_score(a)));
    board
}
