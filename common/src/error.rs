use std::error::Error;
use std::fmt::{Display, Formatter};

/// A batch of errors reported together, one per line.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiError<T>(pub Vec<T>);

impl<T> MultiError<T> {
    /// Turns an accumulated list into a result: `Ok` if nothing went wrong.
    pub fn into_result(self) -> Result<(), Self> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn push(&mut self, err: T) {
        self.0.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T> Default for MultiError<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T: Display> Display for MultiError<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for e in &self.0 {
            writeln!(f, "{}", e)?;
        }
        Ok(())
    }
}

impl<T: Error> Error for MultiError<T> {}
