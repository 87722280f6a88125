/// 雅虎財經
pub mod yahoo;

/// Outcome of one locator pass over a parsed document.
///
/// Locator chains run in a fixed priority order and stop at the first
/// `Found`. `Ignored` means the locator matched an element but its text was
/// unusable (malformed or a sentinel token); like `NotFound` it hands
/// control to the next locator, it exists so that "this never raises" is a
/// property of the type instead of a catch-all convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Located<T> {
    Found(T),
    NotFound,
    Ignored,
}

impl<T> Located<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Located::Found(value) => Some(value),
            Located::NotFound | Located::Ignored => None,
        }
    }
}
