//! Payload path of the current pass, for fault reports.
//!
//! Only recorded with the `debug` feature in debug builds; otherwise every method is a
//! no-op and [`Trace::render`] returns `None`.

use alloc::string::String;
#[cfg(all(debug_assertions, feature = "debug"))]
use alloc::vec::Vec;

#[derive(Debug, Default)]
pub(crate) struct Trace {
    #[cfg(all(debug_assertions, feature = "debug"))]
    path: Vec<String>,
}

impl Trace {
    #[inline]
    pub(crate) fn push(&mut self, name: &str) {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.path.push(String::from(name));
        #[cfg(not(all(debug_assertions, feature = "debug")))]
        let _ = name;
    }

    #[inline]
    pub(crate) fn pop(&mut self) {
        #[cfg(all(debug_assertions, feature = "debug"))]
        self.path.pop();
    }

    /// `Outer > Inner > Innermost`, or `None` when empty or not recorded.
    pub(crate) fn render(&self) -> Option<String> {
        #[cfg(all(debug_assertions, feature = "debug"))]
        {
            if self.path.is_empty() {
                None
            } else {
                Some(self.path.join(" > "))
            }
        }
        #[cfg(not(all(debug_assertions, feature = "debug")))]
        {
            None
        }
    }
}
