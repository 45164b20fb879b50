use std::fmt;
use std::hash::Hasher;

/// One name/value pair attached to a target or a sample.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=\"{}\"", self.name, self.value)
    }
}

/// A label set, kept sorted by label name. Names are unique within a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(Vec<Label>);

impl Labels {
    pub fn new(mut labels: Vec<Label>) -> Self {
        labels.sort();
        labels.dedup_by(|a, b| a.name == b.name);
        Self(labels)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    pub fn set(&mut self, name: &str, value: &str) {
        match self.0.iter_mut().find(|l| l.name == name) {
            Some(label) => label.value = value.to_string(),
            None => {
                self.0.push(Label::new(name, value));
                self.0.sort();
            }
        }
    }

    pub fn retain(&mut self, f: impl FnMut(&Label) -> bool) {
        self.0.retain(f);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Label> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identity hash over the sorted name/value pairs.
    pub fn hash(&self) -> u64 {
        let mut hasher = xxhash_rust::xxh64::Xxh64::new(0);
        let sep: u8 = 0xff;

        for label in &self.0 {
            hasher.write(label.name.as_bytes());
            hasher.write(&[sep]);
            hasher.write(label.value.as_bytes());
            hasher.write(&[sep]);
        }
        hasher.finish()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", label)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<Label> for Labels {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Labels::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = std::slice::Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_replaces_and_keeps_order() {
        let mut labels = Labels::new(vec![
            Label::new("job", "node"),
            Label::new("instance", "a:80"),
        ]);
        labels.set("job", "redis");
        labels.set("zone", "eu-1");

        assert_eq!(labels.get("job"), Some("redis"));
        assert_eq!(labels.len(), 3);
        let names: Vec<_> = labels.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["instance", "job", "zone"]);
    }

    #[test]
    fn hash_is_order_insensitive_and_value_sensitive() {
        let a = Labels::new(vec![Label::new("a", "1"), Label::new("b", "2")]);
        let b = Labels::new(vec![Label::new("b", "2"), Label::new("a", "1")]);
        let c = Labels::new(vec![Label::new("a", "1"), Label::new("b", "3")]);

        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn display_renders_pairs() {
        let labels = Labels::new(vec![Label::new("job", "node")]);
        assert_eq!(labels.to_string(), "{job=\"node\"}");
    }
}
