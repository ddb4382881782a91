use std::fmt;
use std::sync::Arc;

/// Caller-chosen label naming a retention purpose (for example "Level_Intro"
/// or "UI_Settings"). Tags decouple interest in an asset from pointer
/// ownership: unrelated callers can retain the same asset under different
/// tags without coordinating.
///
/// The distinguished NONE tag means "no retention requested".
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(Arc<str>);

impl Tag {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Tag(Arc::from(name.as_ref()))
    }

    /// The tag that requests no retention
    pub fn none() -> Self {
        Tag(Arc::from(""))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S: AsRef<str>> From<S> for Tag {
    fn from(s: S) -> Self {
        Tag::new(s)
    }
}

impl fmt::Debug for Tag {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("Tag").field(&&*self.0).finish()
    }
}

impl fmt::Display for Tag {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.is_none() {
            f.write_str("<none>")
        } else {
            f.write_str(&self.0)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn none_tag_is_none() {
        assert!(Tag::none().is_none());
        assert!(!Tag::new("Level_Intro").is_none());
    }

    #[test]
    fn tags_with_same_name_are_equal() {
        assert_eq!(Tag::new("menu"), Tag::new("menu"));
        assert_ne!(Tag::new("menu"), Tag::new("hud"));
    }
}
