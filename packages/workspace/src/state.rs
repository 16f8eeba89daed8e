use crate::protocol::{CssType, OpenSheet};
use scissors_diff::{apply, diff, PatchError, PatchReport, RulesDiff};
use scissors_rules::{ParseError, ParseResult, RuleTree, StructureError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Unknown sheet: {0}")]
    UnknownSheet(String),

    #[error("No parser registered for {0} sheets")]
    NoParser(CssType),

    #[error("Malformed client rules: {0}")]
    Structure(#[from] StructureError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Patch error: {0}")]
    Patch(#[from] PatchError),

    #[error("Diff does not fit the sheet: {0:?}")]
    DoesNotFit(PatchReport),

    #[error("Parse task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StateResult<T> = Result<T, StateError>;

/// Turns sheet source text into a rule tree
pub trait SheetParser: Send + Sync {
    fn parse(&self, source: &str) -> ParseResult<RuleTree>;
}

impl<F> SheetParser for F
where
    F: Fn(&str) -> ParseResult<RuleTree> + Send + Sync,
{
    fn parse(&self, source: &str) -> ParseResult<RuleTree> {
        self(source)
    }
}

/// Plain CSS through the rules crate parser
#[derive(Debug, Clone, Copy, Default)]
pub struct CssParser;

impl SheetParser for CssParser {
    fn parse(&self, source: &str) -> ParseResult<RuleTree> {
        RuleTree::from_text(source)
    }
}

// Per-sheet cached state
#[derive(Debug, Clone)]
struct SheetState {
    css_type: CssType,
    /// Last successfully parsed tree
    tree: RuleTree,
    source: Option<String>,
    version: u64,
    /// Bumped by every `begin_update`; only the newest ticket commits
    generation: u64,
}

/// A pending reparse of one sheet.
///
/// Parsing happens outside the registry so it can run off the lock; the
/// result is handed back to [`SheetRegistry::finish_update`].
#[derive(Clone)]
pub struct UpdateTicket {
    sheet_name: String,
    generation: u64,
    source: String,
    parser: Arc<dyn SheetParser>,
}

impl UpdateTicket {
    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parse(&self) -> ParseResult<RuleTree> {
        self.parser.parse(&self.source)
    }
}

impl std::fmt::Debug for UpdateTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateTicket")
            .field("sheet_name", &self.sheet_name)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// New tree committed; the diff brings the previous tree to it
    Changed(RulesDiff),
    /// Parsed fine but nothing changed
    Unchanged,
    /// A newer update was started while this one was parsing
    Superseded,
    /// Source did not parse; the last good tree stays
    ParseFailed(ParseError),
}

/// Synchronization state of every open sheet
pub struct SheetRegistry {
    sheets: HashMap<String, SheetState>,
    parsers: HashMap<CssType, Arc<dyn SheetParser>>,
}

impl SheetRegistry {
    /// A registry that parses plain CSS. LESS sheets adopt client rules
    /// until a parser is registered for them.
    pub fn new() -> Self {
        let mut registry = Self {
            sheets: HashMap::new(),
            parsers: HashMap::new(),
        };
        registry.register_parser(CssType::Css, CssParser);
        registry
    }

    pub fn register_parser(&mut self, css_type: CssType, parser: impl SheetParser + 'static) {
        self.parsers.insert(css_type, Arc::new(parser));
    }

    pub fn has_parser(&self, css_type: CssType) -> bool {
        self.parsers.contains_key(&css_type)
    }

    /// Register a client's copy of a sheet.
    ///
    /// Returns the diff that brings the client's rules to the server's
    /// version, or `None` when the client already matches.
    #[instrument(skip(self, open), fields(sheet = %open.name))]
    pub fn open_sheet(&mut self, open: &OpenSheet) -> StateResult<Option<RulesDiff>> {
        let theirs = client_tree(&open.css_rules)?;

        if let Some(ours) = self.sheets.get(&open.name) {
            let rules_diff = diff(&theirs, &ours.tree);
            debug!(entries = rules_diff.len(), "Sheet already open");
            return Ok((!rules_diff.is_empty()).then_some(rules_diff));
        }

        let parsed = match (&open.source, self.parsers.get(&open.css_type)) {
            (Some(source), Some(parser)) => match parser.parse(source) {
                Ok(tree) => Some(tree),
                Err(error) => {
                    warn!(%error, "Source failed to parse, adopting client rules");
                    None
                }
            },
            _ => None,
        };

        let reply = parsed.as_ref().map(|ours| diff(&theirs, ours));
        let tree = parsed.unwrap_or(theirs);
        debug!(rules = tree.len(), css_type = %open.css_type, "Opened sheet");

        self.sheets.insert(
            open.name.clone(),
            SheetState {
                css_type: open.css_type,
                tree,
                source: open.source.clone(),
                version: 0,
                generation: 0,
            },
        );

        Ok(reply.filter(|rules_diff| !rules_diff.is_empty()))
    }

    /// Start reparsing a sheet from new source text. Any ticket handed out
    /// earlier for the same sheet can no longer commit.
    pub fn begin_update(&mut self, name: &str, source: impl Into<String>) -> StateResult<UpdateTicket> {
        let sheet = self
            .sheets
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownSheet(name.to_string()))?;
        let parser = self
            .parsers
            .get(&sheet.css_type)
            .cloned()
            .ok_or(StateError::NoParser(sheet.css_type))?;

        sheet.generation += 1;
        Ok(UpdateTicket {
            sheet_name: name.to_string(),
            generation: sheet.generation,
            source: source.into(),
            parser,
        })
    }

    /// Commit the result of parsing a ticket's source.
    #[instrument(skip(self, ticket, parsed), fields(sheet = %ticket.sheet_name, generation = ticket.generation))]
    pub fn finish_update(
        &mut self,
        ticket: UpdateTicket,
        parsed: ParseResult<RuleTree>,
    ) -> StateResult<UpdateOutcome> {
        let sheet = self
            .sheets
            .get_mut(&ticket.sheet_name)
            .ok_or_else(|| StateError::UnknownSheet(ticket.sheet_name.clone()))?;

        if ticket.generation != sheet.generation {
            debug!(current = sheet.generation, "Dropping superseded parse");
            return Ok(UpdateOutcome::Superseded);
        }

        let tree = match parsed {
            Ok(tree) => tree,
            Err(error) => {
                debug!(%error, "Parse failed, keeping last good tree");
                return Ok(UpdateOutcome::ParseFailed(error));
            }
        };

        let rules_diff = diff(&sheet.tree, &tree);
        sheet.source = Some(ticket.source);
        if rules_diff.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }

        sheet.tree = tree;
        sheet.version += 1;
        debug!(entries = rules_diff.len(), version = sheet.version, "Committed update");
        Ok(UpdateOutcome::Changed(rules_diff))
    }

    /// Reparse and commit in one step
    pub fn update(&mut self, name: &str, source: impl Into<String>) -> StateResult<UpdateOutcome> {
        let ticket = self.begin_update(name, source)?;
        let parsed = ticket.parse();
        self.finish_update(ticket, parsed)
    }

    /// Apply an edit made by a client to the server's copy.
    ///
    /// The edit commits only if every entry applies; otherwise the sheet
    /// is left as it was.
    pub fn apply_client_diff(&mut self, name: &str, rules_diff: &RulesDiff) -> StateResult<PatchReport> {
        let sheet = self
            .sheets
            .get_mut(name)
            .ok_or_else(|| StateError::UnknownSheet(name.to_string()))?;

        let mut next = sheet.tree.clone();
        let report = apply(&mut next, rules_diff)?;
        if !report.is_clean() {
            warn!(sheet = name, ?report, "Client diff does not fit, keeping the sheet");
            return Err(StateError::DoesNotFit(report));
        }

        sheet.tree = next;
        sheet.version += 1;
        Ok(report)
    }

    pub fn tree(&self, name: &str) -> Option<&RuleTree> {
        self.sheets.get(name).map(|sheet| &sheet.tree)
    }

    pub fn source(&self, name: &str) -> Option<&str> {
        self.sheets.get(name).and_then(|sheet| sheet.source.as_deref())
    }

    pub fn css_type(&self, name: &str) -> Option<CssType> {
        self.sheets.get(name).map(|sheet| sheet.css_type)
    }

    pub fn version(&self, name: &str) -> Option<u64> {
        self.sheets.get(name).map(|sheet| sheet.version)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sheets.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }
}

impl Default for SheetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn client_tree(css_rules: &serde_json::Value) -> StateResult<RuleTree> {
    if css_rules.is_null() {
        return Ok(RuleTree::new());
    }
    Ok(RuleTree::from_structured(css_rules)?)
}
