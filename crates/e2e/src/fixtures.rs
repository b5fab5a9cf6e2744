//! Fixture table: input/expected pairs for the translator
//!
//! Rows are grouped into positive, negative and incremental-typing (UI)
//! cases. Negative rows are known-bad inputs that are expected to fail.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{E2eError, E2eResult};

/// Marker used in place of an expected string for known failures
pub const EXPECTED_FAILURE_SENTINEL: &str = "__NEGATIVE_EXPECTED_FAILURE__";

const BUILTIN_FIXTURES: &str = include_str!("../fixtures/swifttranslator.yaml");

/// Size tag, documentation only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseSize {
    S,
    M,
    L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Positive,
    Negative,
    Ui,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Positive => "positive",
            Category::Negative => "negative",
            Category::Ui => "ui",
        })
    }
}

impl FromStr for Category {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" | "pos" => Ok(Category::Positive),
            "negative" | "neg" => Ok(Category::Negative),
            "ui" => Ok(Category::Ui),
            other => Err(E2eError::Config(format!("unknown category: {}", other))),
        }
    }
}

/// What the output should be
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Expectation {
    Exact(String),
    /// Pre-declared failure, no output can satisfy it
    Failure,
}

impl Expectation {
    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Expectation::Exact(expected) => expected == actual,
            Expectation::Failure => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Expectation::Exact(expected) => expected,
            Expectation::Failure => EXPECTED_FAILURE_SENTINEL,
        }
    }
}

impl From<String> for Expectation {
    fn from(s: String) -> Self {
        if s == EXPECTED_FAILURE_SENTINEL {
            Expectation::Failure
        } else {
            Expectation::Exact(s)
        }
    }
}

impl From<Expectation> for String {
    fn from(e: Expectation) -> Self {
        match e {
            Expectation::Exact(s) => s,
            Expectation::Failure => EXPECTED_FAILURE_SENTINEL.to_string(),
        }
    }
}

/// One translate-and-compare row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub tc_id: String,
    pub name: String,
    pub input: String,
    pub expected: Expectation,

    /// Literal output noted for a negative row, kept for reference only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded: Option<String>,

    pub length: CaseSize,
}

/// Incremental typing row: a prefix first, then the rest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiCase {
    pub tc_id: String,
    pub name: String,
    pub input: String,
    pub partial_input: String,
    pub expected_full: String,
    pub length: CaseSize,
}

impl UiCase {
    /// Text still to type once the prefix is in
    pub fn remainder(&self) -> Option<&str> {
        self.input.strip_prefix(self.partial_input.as_str())
    }
}

/// A runnable row of any category
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Case {
    Translation { category: Category, case: TestCase },
    Ui(UiCase),
}

impl Case {
    pub fn tc_id(&self) -> &str {
        match self {
            Case::Translation { case, .. } => &case.tc_id,
            Case::Ui(case) => &case.tc_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Case::Translation { case, .. } => &case.name,
            Case::Ui(case) => &case.name,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Case::Translation { category, .. } => *category,
            Case::Ui(_) => Category::Ui,
        }
    }

    pub fn length(&self) -> CaseSize {
        match self {
            Case::Translation { case, .. } => case.length,
            Case::Ui(case) => case.length,
        }
    }

    pub fn input(&self) -> &str {
        match self {
            Case::Translation { case, .. } => &case.input,
            Case::Ui(case) => &case.input,
        }
    }

    /// Expected text as written in the fixture
    pub fn expected(&self) -> &str {
        match self {
            Case::Translation { case, .. } => case.expected.as_str(),
            Case::Ui(case) => &case.expected_full,
        }
    }

    /// `Pos_Fun_0002 - Convert future plan sentence`
    pub fn title(&self) -> String {
        format!("{} - {}", self.tc_id(), self.name())
    }
}

/// All fixture rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSet {
    #[serde(default)]
    pub positive: Vec<TestCase>,
    #[serde(default)]
    pub negative: Vec<TestCase>,
    #[serde(default)]
    pub ui: Vec<UiCase>,
}

impl FixtureSet {
    /// The fixture table shipped with the crate
    pub fn builtin() -> E2eResult<Self> {
        Self::from_yaml(BUILTIN_FIXTURES)
    }

    /// Parse, normalize and validate a fixture document
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let mut set: Self = serde_yaml::from_str(yaml)?;
        set.normalize();
        set.validate()?;
        Ok(set)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::InvalidFixture(format!("{}: {}", path.display(), e)))
    }

    /// Merge every `.yaml`/`.yml` file under `dir`, in path order
    pub fn load_dir(dir: &Path) -> E2eResult<Self> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut merged = Self::default();
        for path in &paths {
            let set = Self::from_file(path)?;
            merged.positive.extend(set.positive);
            merged.negative.extend(set.negative);
            merged.ui.extend(set.ui);
        }
        merged.validate()?;
        Ok(merged)
    }

    /// Load a single file or a directory of files
    pub fn load(path: &Path) -> E2eResult<Self> {
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::from_file(path)
        }
    }

    /// Negative rows are judged by the sentinel only; stray literals are
    /// moved to `recorded`.
    fn normalize(&mut self) {
        for case in &mut self.negative {
            if let Expectation::Exact(literal) = &case.expected {
                case.recorded = Some(literal.clone());
                case.expected = Expectation::Failure;
            }
        }
    }

    pub fn validate(&self) -> E2eResult<()> {
        let mut seen = HashSet::new();

        for case in self.positive.iter().chain(&self.negative) {
            check_row(&mut seen, &case.tc_id, &case.input)?;
        }
        for case in &self.positive {
            match &case.expected {
                Expectation::Exact(s) if !s.is_empty() => {}
                _ => {
                    return Err(E2eError::InvalidFixture(format!(
                        "{}: positive case needs a literal expected output",
                        case.tc_id
                    )))
                }
            }
        }
        for case in &self.ui {
            check_row(&mut seen, &case.tc_id, &case.input)?;
            if case.partial_input.is_empty() || case.remainder().is_none() {
                return Err(E2eError::InvalidFixture(format!(
                    "{}: partial_input must be a non-empty prefix of input",
                    case.tc_id
                )));
            }
            if case.expected_full.trim().is_empty() {
                return Err(E2eError::InvalidFixture(format!(
                    "{}: expected_full is empty",
                    case.tc_id
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.positive.len() + self.negative.len() + self.ui.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every row in run order: positive, negative, then UI
    pub fn cases(&self) -> Vec<Case> {
        let positive = self.positive.iter().cloned().map(|case| Case::Translation {
            category: Category::Positive,
            case,
        });
        let negative = self.negative.iter().cloned().map(|case| Case::Translation {
            category: Category::Negative,
            case,
        });
        let ui = self.ui.iter().cloned().map(Case::Ui);
        positive.chain(negative).chain(ui).collect()
    }
}

fn check_row(seen: &mut HashSet<String>, tc_id: &str, input: &str) -> E2eResult<()> {
    if tc_id.trim().is_empty() {
        return Err(E2eError::InvalidFixture("case without tc_id".into()));
    }
    if input.is_empty() {
        return Err(E2eError::InvalidFixture(format!("{}: empty input", tc_id)));
    }
    if !seen.insert(tc_id.to_string()) {
        return Err(E2eError::InvalidFixture(format!("duplicate tc_id: {}", tc_id)));
    }
    Ok(())
}
