//! Classification error codes collected for one cluster.

use std::collections::BTreeSet;

use mco_model::GhmCode;

/// Priority of failures of the grouper itself over stay errors.
const FAILURE_PRIORITY: i8 = 2;
/// Priority of blocking stay errors.
const ERROR_PRIORITY: i8 = 1;
/// Priority of non-blocking errors that may still be the main error.
const NOTICE_PRIORITY: i8 = 0;

/// Error codes raised while classifying a cluster.
///
/// The main error is the code with the highest priority, the smallest code
/// among equals. Warnings are kept in the set but never become the main
/// error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSet {
    main_error: Option<u16>,
    priority: i8,
    errors: BTreeSet<u16>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, error: u16, priority: i8) {
        let replaces = match self.main_error {
            None => true,
            Some(main) => {
                priority > self.priority || (priority == self.priority && error < main)
            }
        };
        if replaces {
            self.main_error = Some(error);
            self.priority = priority;
        }
        self.errors.insert(error);
    }

    /// Record a blocking `error` without changing the GHM.
    pub fn record(&mut self, error: u16) {
        self.insert(error, ERROR_PRIORITY);
    }

    /// Record a non-blocking `error`; it only wins over other notices.
    pub fn notice(&mut self, error: u16) {
        self.insert(error, NOTICE_PRIORITY);
    }

    /// Record a warning, which never becomes the main error.
    pub fn warn(&mut self, error: u16) {
        self.errors.insert(error);
    }

    /// Record `error` and return the error GHM `90Z0{category}Z`.
    ///
    /// Category 3 failures take precedence over every stay error.
    pub fn set(&mut self, category: u8, error: u16) -> GhmCode {
        let priority = if category == 3 {
            FAILURE_PRIORITY
        } else {
            ERROR_PRIORITY
        };
        self.insert(error, priority);
        GhmCode::new(90, b'Z', category, b'Z')
    }

    pub fn main_error(&self) -> Option<u16> {
        self.main_error
    }

    pub fn contains(&self, error: u16) -> bool {
        self.errors.contains(&error)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Codes in ascending order.
    pub fn to_vec(&self) -> Vec<u16> {
        self.errors.iter().copied().collect()
    }
}
