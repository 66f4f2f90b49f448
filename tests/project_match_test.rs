use grovr::project_match::{find_best_matching_project, Named};

struct P(&'static str);

impl Named for P {
    fn name(&self) -> &str {
        self.0
    }
}

fn best<'a>(search: &str, projects: &'a [P]) -> Option<&'a str> {
    find_best_matching_project(search, projects).map(|p| p.0)
}

#[test]
fn exact_match_wins_over_everything() {
    let projects = [P("foobar"), P("Foo"), P("foo")];
    assert_eq!(best("foo", &projects), Some("foo"));
}

#[test]
fn case_insensitive_match_beats_substring() {
    let projects = [P("Foo"), P("foobar"), P("xfoo")];
    assert_eq!(best("foo", &projects), Some("Foo"));
}

#[test]
fn substring_picks_the_shortest_name() {
    let projects = [P("foobar"), P("xfoobar"), P("afoob")];
    assert_eq!(best("foo", &projects), Some("afoob"));

    let projects = [P("foobar"), P("xfoobar")];
    assert_eq!(best("FOO", &projects), Some("foobar"));
}

#[test]
fn substring_tie_keeps_first() {
    let projects = [P("abfoo"), P("fooab")];
    assert_eq!(best("foo", &projects), Some("abfoo"));
}

#[test]
fn no_match_or_empty_inputs_yield_none() {
    let projects = [P("web"), P("api")];
    assert_eq!(best("mobile", &projects), None);
    assert_eq!(best("", &projects), None);
    assert_eq!(best("web", &[]), None);
}
