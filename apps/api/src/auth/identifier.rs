use std::sync::OnceLock;

use regex::Regex;

/// `digits/UPPERCASE/digits`, ASCII only.
const EMPLOYEE_ID_PATTERN: &str = r"^[0-9]+/[A-Z]+/[0-9]+$";

fn employee_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(EMPLOYEE_ID_PATTERN).expect("employee id pattern is valid"))
}

/// A login identifier after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    EmployeeId(String),
    /// Lowercased email (or any other non-employee-id text).
    Email(String),
}

impl Identifier {
    /// Classifies a raw login identifier. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if is_employee_id(trimmed) {
            Some(Identifier::EmployeeId(trimmed.to_string()))
        } else {
            Some(Identifier::Email(trimmed.to_lowercase()))
        }
    }
}

pub fn is_employee_id(s: &str) -> bool {
    employee_id_regex().is_match(s)
}

/// Builds `{department_code}/{CADRE}/{sequence}`.
pub fn compose_employee_id(department_code: i32, cadre_code: &str, sequence: i32) -> String {
    format!("{department_code}/{}/{sequence}", cadre_code.to_ascii_uppercase())
}
