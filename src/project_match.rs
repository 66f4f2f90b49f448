/// Anything that can be looked up by a human-typed project name.
pub trait Named {
    fn name(&self) -> &str;
}

/// Resolve a free-text project name to at most one project.
///
/// Tiers, first non-empty wins: exact match, case-insensitive match, then
/// case-insensitive substring. Within the substring tier the shortest name is
/// the most specific match; ties keep the first candidate.
pub fn find_best_matching_project<'a, T: Named>(search: &str, projects: &'a [T]) -> Option<&'a T> {
    if search.is_empty() || projects.is_empty() {
        return None;
    }

    if let Some(exact) = projects.iter().find(|p| p.name() == search) {
        return Some(exact);
    }

    let lower_search = search.to_lowercase();
    if let Some(folded) = projects
        .iter()
        .find(|p| p.name().to_lowercase() == lower_search)
    {
        return Some(folded);
    }

    projects
        .iter()
        .filter(|p| p.name().to_lowercase().contains(&lower_search))
        .fold(None, |best: Option<&'a T>, candidate| match best {
            Some(current) if current.name().chars().count() <= candidate.name().chars().count() => {
                Some(current)
            }
            _ => Some(candidate),
        })
}
