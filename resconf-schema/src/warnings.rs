/// An accumulating list of non-fatal warnings, each distinct text kept once
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Warnings(Vec<String>);

impl Warnings {
    /// Records a warning unless the same text was already recorded; returns whether it was new
    pub fn add(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.0.contains(&text) {
            return false;
        }
        tracing::warn!("{}", text);
        self.0.push(text);
        true
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::Warnings;

    #[test]
    fn duplicates_are_dropped() {
        let mut warnings = Warnings::default();
        assert!(warnings.add("using deprecated keyword X"));
        assert!(!warnings.add("using deprecated keyword X".to_owned()));
        assert!(warnings.add("using deprecated keyword Y"));
        assert_eq!(
            warnings.iter().collect::<Vec<_>>(),
            ["using deprecated keyword X", "using deprecated keyword Y"]
        );
        warnings.clear();
        assert!(warnings.is_empty());
    }
}
