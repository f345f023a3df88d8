// Wizard state machine: Upload -> Preview -> Mapping -> Options -> Generate
//
// One value holds the current stage and every committed stage output.
// Forward moves happen only through a stage's completion; backward moves keep
// later outputs until the returned-to stage is completed again.

use std::fmt;

use econfab_cleaner::Cleaner;
use econfab_core::{
    AssemblyError, CanonicalDataset, ConfigError, GeneratedArtifact, GenerationError, ParseError, RegressionChoices,
    RegressionSpec, RoleAssignment,
};
use econfab_engine::{configure, roles, Advisory, ScriptGenerator};
use econfab_io::TableParser;
use serde::Serialize;
use thiserror::Error;

use crate::assemble::DatasetAssembler;
use crate::ingest::{self, IngestError, UploadedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Preview,
    Mapping,
    Options,
    Generate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::Preview => "preview",
            Self::Mapping => "mapping",
            Self::Options => "options",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("cannot {action} in the {stage} stage")]
    WrongStage { stage: Stage, action: &'static str },

    #[error("cannot go back from {from} to {to}")]
    InvalidNavigation { from: Stage, to: Stage },

    #[error("a cleaning request is already pending")]
    SubmissionPending,

    #[error("no files to upload")]
    NoFiles,

    #[error("no uploaded file at position {0}")]
    NoSuchFile(usize),

    #[error("background decoding task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Identity of one assembly request. Only the most recent ticket, while the
/// wizard is still in `Preview`, may commit its result.
#[derive(Debug, PartialEq, Eq)]
pub struct AssemblyTicket {
    id: u64,
}

impl AssemblyTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// What happened to an assembly result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyOutcome {
    /// Dataset committed; the wizard moved to `Mapping`
    Committed,
    /// Result discarded: the request was superseded or the wizard moved on
    Stale,
}

#[derive(Debug, Clone, Default)]
struct Outputs {
    files: Option<Vec<UploadedFile>>,
    dataset: Option<CanonicalDataset>,
    assignment: Option<RoleAssignment>,
    spec: Option<RegressionSpec>,
    artifact: Option<GeneratedArtifact>,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    stage: Stage,
    outputs: Outputs,
    pending: Option<u64>,
    next_request: u64,
    generator: ScriptGenerator,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new(ScriptGenerator::default())
    }
}

impl Wizard {
    pub fn new(generator: ScriptGenerator) -> Self {
        Self {
            stage: Stage::Upload,
            outputs: Outputs::default(),
            pending: None,
            next_request: 1,
            generator,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn files(&self) -> &[UploadedFile] {
        self.outputs.files.as_deref().unwrap_or_default()
    }

    pub fn dataset(&self) -> Option<&CanonicalDataset> {
        self.outputs.dataset.as_ref()
    }

    pub fn assignment(&self) -> Option<&RoleAssignment> {
        self.outputs.assignment.as_ref()
    }

    pub fn spec(&self) -> Option<&RegressionSpec> {
        self.outputs.spec.as_ref()
    }

    pub fn artifact(&self) -> Option<&GeneratedArtifact> {
        self.outputs.artifact.as_ref()
    }

    pub fn is_assembly_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn expect_stage(&self, stage: Stage, action: &'static str) -> Result<(), WizardError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(WizardError::WrongStage {
                stage: self.stage,
                action,
            })
        }
    }

    fn advance(&mut self, to: Stage) {
        tracing::info!(from = %self.stage, to = %to, "wizard stage completed");
        self.stage = to;
    }

    // ---------------------------------------------------------------------
    // Upload
    // ---------------------------------------------------------------------

    /// Commit the successfully parsed files (failed files already dropped).
    pub fn complete_upload(&mut self, files: Vec<UploadedFile>) -> Result<(), WizardError> {
        self.expect_stage(Stage::Upload, "complete the upload")?;
        if files.is_empty() {
            return Err(WizardError::NoFiles);
        }
        self.outputs.files = Some(files);
        self.advance(Stage::Preview);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Preview
    // ---------------------------------------------------------------------

    /// Switch the active sheet of the file at `index`, decoding only that
    /// sheet off the async thread. The committed file list is replaced as a
    /// whole once the new preview is ready.
    pub async fn select_sheet(&mut self, parser: TableParser, index: usize, sheet: &str) -> Result<(), WizardError> {
        self.expect_stage(Stage::Preview, "select a sheet")?;
        let current = self.files().get(index).ok_or(WizardError::NoSuchFile(index))?;
        let switched = ingest::switch_sheet(parser, current, sheet).await.map_err(|e| match e {
            IngestError::Parse(e) => WizardError::Parse(e),
            other => WizardError::Task(other.to_string()),
        })?;
        tracing::debug!(file = switched.name(), sheet, "active sheet changed");

        let mut files = self.files().to_vec();
        files[index] = switched;
        self.outputs.files = Some(files);
        Ok(())
    }

    /// Commit a dataset assembled outside the ticket flow.
    pub fn complete_preview(&mut self, dataset: CanonicalDataset) -> Result<(), WizardError> {
        self.expect_stage(Stage::Preview, "complete the preview")?;
        self.pending = None;
        self.outputs.dataset = Some(dataset);
        self.advance(Stage::Mapping);
        Ok(())
    }

    /// Start an assembly request. Fails while another one is pending.
    pub fn begin_assembly(&mut self) -> Result<AssemblyTicket, WizardError> {
        self.expect_stage(Stage::Preview, "assemble the dataset")?;
        if self.pending.is_some() {
            return Err(WizardError::SubmissionPending);
        }
        let id = self.next_request;
        self.next_request += 1;
        self.pending = Some(id);
        tracing::debug!(request = id, "assembly started");
        Ok(AssemblyTicket { id })
    }

    /// Deliver the result of the request identified by `ticket`.
    ///
    /// A result for a superseded request, or one arriving after the wizard
    /// left `Preview`, is discarded and reported as `Stale`. A failed
    /// request commits nothing and leaves the wizard in `Preview`.
    pub fn finish_assembly(
        &mut self,
        ticket: AssemblyTicket,
        result: Result<CanonicalDataset, AssemblyError>,
    ) -> Result<AssemblyOutcome, WizardError> {
        if self.stage != Stage::Preview || self.pending != Some(ticket.id) {
            tracing::warn!(request = ticket.id, stage = %self.stage, "discarding stale assembly result");
            return Ok(AssemblyOutcome::Stale);
        }
        self.pending = None;
        let dataset = result?;
        self.complete_preview(dataset)?;
        Ok(AssemblyOutcome::Committed)
    }

    /// Run a whole assembly request against the committed files.
    pub async fn assemble<C: Cleaner>(
        &mut self,
        assembler: &DatasetAssembler<C>,
        force_clean: bool,
    ) -> Result<AssemblyOutcome, WizardError> {
        let ticket = self.begin_assembly()?;
        let result = assembler.assemble(self.files(), force_clean).await;
        self.finish_assembly(ticket, result)
    }

    // ---------------------------------------------------------------------
    // Mapping
    // ---------------------------------------------------------------------

    /// Roles to start the mapping stage from: the last committed assignment.
    pub fn mapping_prior(&self) -> RoleAssignment {
        self.outputs.assignment.clone().unwrap_or_default()
    }

    /// Complete `partial` over the dataset headers and commit it. Returns
    /// advisory notes; none of them block.
    pub fn complete_mapping(&mut self, partial: &RoleAssignment) -> Result<Vec<Advisory>, WizardError> {
        self.expect_stage(Stage::Mapping, "complete the mapping")?;
        let headers = self.outputs.dataset.as_ref().map(|d| d.headers()).unwrap_or_default();
        let assignment = roles::complete(headers, partial);
        let notes = roles::advise(&assignment);
        self.outputs.assignment = Some(assignment);
        self.advance(Stage::Options);
        Ok(notes)
    }

    /// Headers offered as cluster or fixed-effect variables.
    pub fn grouping_candidates(&self) -> Vec<&str> {
        match (&self.outputs.dataset, &self.outputs.assignment) {
            (Some(ds), Some(a)) => roles::candidates(ds.headers(), a),
            _ => Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Options
    // ---------------------------------------------------------------------

    pub fn complete_options(&mut self, choices: &RegressionChoices) -> Result<(), WizardError> {
        self.expect_stage(Stage::Options, "complete the options")?;
        let headers = self.outputs.dataset.as_ref().map(|d| d.headers()).unwrap_or_default();
        let assignment = self.outputs.assignment.clone().unwrap_or_default();
        let spec = configure(headers, &assignment, choices)?;
        self.outputs.spec = Some(spec);
        self.advance(Stage::Generate);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Generate
    // ---------------------------------------------------------------------

    pub fn generate(&mut self) -> Result<&GeneratedArtifact, WizardError> {
        self.expect_stage(Stage::Generate, "generate")?;
        let (Some(dataset), Some(assignment), Some(spec)) =
            (&self.outputs.dataset, &self.outputs.assignment, &self.outputs.spec)
        else {
            return Err(WizardError::WrongStage {
                stage: self.stage,
                action: "generate",
            });
        };
        let artifact = self.generator.generate(dataset, assignment, spec)?;
        tracing::info!(fingerprint = %artifact.fingerprint(), "artifact generated");
        Ok(self.outputs.artifact.insert(artifact))
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    /// Return to an earlier stage. Later outputs stay until replaced.
    pub fn go_back(&mut self, to: Stage) -> Result<(), WizardError> {
        if to >= self.stage {
            return Err(WizardError::InvalidNavigation { from: self.stage, to });
        }
        tracing::info!(from = %self.stage, to = %to, "wizard went back");
        self.pending = None;
        self.stage = to;
        Ok(())
    }

    /// Back to `Upload` with every output cleared.
    pub fn reset(&mut self) {
        tracing::info!(from = %self.stage, "wizard reset");
        self.stage = Stage::Upload;
        self.outputs = Outputs::default();
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use econfab_core::{Cell, RegressionType, Role};

    fn uploaded(name: &str, content: &str) -> UploadedFile {
        let parser = TableParser::default();
        let raw = parser.read_input(name, content.as_bytes().to_vec()).unwrap();
        let parsed = parser.preview(&raw).unwrap();
        UploadedFile { raw, parsed }
    }

    fn dataset() -> CanonicalDataset {
        let headers = ["id", "year", "gdp", "inflation"].iter().map(|s| s.to_string()).collect();
        let rows = vec![vec![Cell::from_text("1"), Cell::from_text("2000"), Cell::from_text("1.5"), Cell::from_text("2.0")]];
        CanonicalDataset::new(headers, rows)
    }

    fn roles() -> RoleAssignment {
        RoleAssignment::new()
            .with("id", Role::Id)
            .with("year", Role::Time)
            .with("gdp", Role::Dependent)
            .with("inflation", Role::Independent)
    }

    fn at_preview() -> Wizard {
        let mut w = Wizard::default();
        w.complete_upload(vec![uploaded("a.csv", "x\n1\n")]).unwrap();
        w
    }

    #[test]
    fn test_happy_path() {
        let mut w = at_preview();
        assert_eq!(w.stage(), Stage::Preview);
        w.complete_preview(dataset()).unwrap();
        assert_eq!(w.stage(), Stage::Mapping);

        let notes = w.complete_mapping(&roles()).unwrap();
        assert_eq!(w.stage(), Stage::Options);
        assert!(notes.contains(&Advisory::NoInstruments));
        assert_eq!(w.assignment().unwrap().len(), 4);
        assert_eq!(w.grouping_candidates(), vec!["id"]);

        let choices = RegressionChoices {
            robust_se: Some(true),
            ..Default::default()
        };
        w.complete_options(&choices).unwrap();
        assert_eq!(w.stage(), Stage::Generate);
        assert_eq!(w.spec().unwrap().kind, RegressionType::Ols);

        let text = w.generate().unwrap().script_text().to_string();
        assert!(text.contains("regress gdp inflation, vce(robust)"));
        assert!(w.artifact().is_some());
    }

    #[test]
    fn test_upload_requires_files() {
        let mut w = Wizard::default();
        assert!(matches!(w.complete_upload(Vec::new()), Err(WizardError::NoFiles)));
        assert_eq!(w.stage(), Stage::Upload);
    }

    #[test]
    fn test_completion_only_in_own_stage() {
        let mut w = Wizard::default();
        let err = w.complete_preview(dataset()).unwrap_err();
        assert!(matches!(err, WizardError::WrongStage { stage: Stage::Upload, .. }));
        assert!(w.generate().is_err());
    }

    #[test]
    fn test_generation_error_keeps_stage() {
        let mut w = at_preview();
        w.complete_preview(dataset()).unwrap();
        w.complete_mapping(&RoleAssignment::new().with("gdp", Role::Independent)).unwrap();
        w.complete_options(&RegressionChoices::default()).unwrap();
        let err = w.generate().unwrap_err();
        assert!(matches!(err, WizardError::Generation(GenerationError::MissingRole(Role::Dependent))));
        assert_eq!(w.stage(), Stage::Generate);
        assert!(w.artifact().is_none());
    }

    #[test]
    fn test_config_error_no_partial_commit() {
        let mut w = at_preview();
        w.complete_preview(dataset()).unwrap();
        w.complete_mapping(&roles()).unwrap();
        let choices = RegressionChoices {
            kind: "FixedEffects".into(),
            ..Default::default()
        };
        let err = w.complete_options(&choices).unwrap_err();
        assert!(matches!(err, WizardError::Config(ConfigError::EmptyFixedEffects)));
        assert_eq!(w.stage(), Stage::Options);
        assert!(w.spec().is_none());
    }

    #[test]
    fn test_back_keeps_outputs_and_recompletion_replaces() {
        let mut w = at_preview();
        w.complete_preview(dataset()).unwrap();
        w.complete_mapping(&roles()).unwrap();
        w.complete_options(&RegressionChoices::default()).unwrap();

        w.go_back(Stage::Mapping).unwrap();
        assert_eq!(w.stage(), Stage::Mapping);
        assert!(w.spec().is_some());
        assert_eq!(w.mapping_prior().role_of("gdp"), Some(Role::Dependent));

        // Re-completion replaces rather than merges
        w.complete_mapping(&RoleAssignment::new().with("inflation", Role::Dependent)).unwrap();
        let a = w.assignment().unwrap();
        assert_eq!(a.role_of("inflation"), Some(Role::Dependent));
        assert_eq!(a.role_of("gdp"), Some(Role::Ignore));
    }

    #[test]
    fn test_go_back_only_backwards() {
        let mut w = at_preview();
        assert!(matches!(
            w.go_back(Stage::Mapping),
            Err(WizardError::InvalidNavigation { from: Stage::Preview, to: Stage::Mapping })
        ));
        assert!(w.go_back(Stage::Preview).is_err());
        w.go_back(Stage::Upload).unwrap();
        assert_eq!(w.files().len(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut w = at_preview();
        w.complete_preview(dataset()).unwrap();
        w.reset();
        assert_eq!(w.stage(), Stage::Upload);
        assert!(w.files().is_empty());
        assert!(w.dataset().is_none());
    }

    #[test]
    fn test_duplicate_submission_guard() {
        let mut w = at_preview();
        let ticket = w.begin_assembly().unwrap();
        assert!(w.is_assembly_pending());
        assert!(matches!(w.begin_assembly(), Err(WizardError::SubmissionPending)));

        assert_eq!(w.finish_assembly(ticket, Ok(dataset())).unwrap(), AssemblyOutcome::Committed);
        assert_eq!(w.stage(), Stage::Mapping);
        assert!(!w.is_assembly_pending());
    }

    #[test]
    fn test_stale_result_after_navigation() {
        let mut w = at_preview();
        let ticket = w.begin_assembly().unwrap();
        w.go_back(Stage::Upload).unwrap();
        w.complete_upload(vec![uploaded("b.csv", "y\n2\n")]).unwrap();

        // Back in Preview, but the old request no longer counts
        assert_eq!(w.finish_assembly(ticket, Ok(dataset())).unwrap(), AssemblyOutcome::Stale);
        assert_eq!(w.stage(), Stage::Preview);
        assert!(w.dataset().is_none());

        // A fresh request commits
        let fresh = w.begin_assembly().unwrap();
        assert_eq!(w.finish_assembly(fresh, Ok(dataset())).unwrap(), AssemblyOutcome::Committed);
    }

    #[test]
    fn test_stale_result_after_reset() {
        let mut w = at_preview();
        let ticket = w.begin_assembly().unwrap();
        w.reset();
        assert_eq!(w.finish_assembly(ticket, Ok(dataset())).unwrap(), AssemblyOutcome::Stale);
        assert_eq!(w.stage(), Stage::Upload);
    }

    #[test]
    fn test_failed_assembly_stays_in_preview() {
        let mut w = at_preview();
        let ticket = w.begin_assembly().unwrap();
        let err = w.finish_assembly(ticket, Err(AssemblyError::EmptyPayload)).unwrap_err();
        assert!(matches!(err, WizardError::Assembly(AssemblyError::EmptyPayload)));
        assert_eq!(w.stage(), Stage::Preview);
        // Explicit re-submission is possible
        assert!(w.begin_assembly().is_ok());
    }

    #[tokio::test]
    async fn test_select_sheet_in_preview() {
        let mut w = at_preview();
        let parser = TableParser::default();
        assert!(matches!(
            w.select_sheet(parser, 0, "Other").await,
            Err(WizardError::Parse(ParseError::UnknownSheet { .. }))
        ));
        assert!(matches!(w.select_sheet(parser, 3, "Sheet1").await, Err(WizardError::NoSuchFile(3))));
        w.select_sheet(parser, 0, "Sheet1").await.unwrap();
    }

    #[tokio::test]
    async fn test_select_sheet_replaces_file_list() {
        let mut wb = rust_xlsxwriter::Workbook::new();
        for (name, header) in [("2000", "gdp"), ("2001", "rate")] {
            let ws = wb.add_worksheet().set_name(name).unwrap();
            ws.write_string(0, 0, header).unwrap();
            ws.write_number(1, 0, 1.0).unwrap();
        }
        let parser = TableParser::default();
        let raw = parser.read_input("panel.xlsx", wb.save_to_buffer().unwrap()).unwrap();
        let parsed = parser.preview(&raw).unwrap();

        let mut w = Wizard::default();
        w.complete_upload(vec![uploaded("a.csv", "x\n1\n"), UploadedFile { raw, parsed }]).unwrap();
        let before = w.files().to_vec();

        w.select_sheet(parser, 1, "2001").await.unwrap();
        assert_eq!(w.files()[1].active_sheet(), "2001");
        assert_eq!(w.files()[1].parsed.preview.headers(), &["rate"]);
        assert_eq!(w.files()[0], before[0]);
        // The previous list is a separate value, unchanged by the switch
        assert_eq!(before[1].active_sheet(), "2000");

        // A failed switch leaves the committed list as it was
        let committed = w.files().to_vec();
        assert!(w.select_sheet(parser, 1, "2002").await.is_err());
        assert_eq!(w.files(), committed.as_slice());
    }
}
