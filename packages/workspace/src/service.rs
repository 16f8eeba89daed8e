use crate::hub::{ConnectionId, Hub};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{SheetRegistry, StateResult, UpdateOutcome};
use crate::watcher::SheetFilter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, instrument, warn};

/// Shared synchronization service behind every connection
#[derive(Clone)]
pub struct Workspace {
    registry: Arc<Mutex<SheetRegistry>>,
    hub: Hub,
    root_dir: PathBuf,
    filter: SheetFilter,
}

impl Workspace {
    pub fn new(registry: SheetRegistry, root_dir: PathBuf, filter: SheetFilter) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
            hub: Hub::new(),
            root_dir,
            filter,
        }
    }

    pub fn registry(&self) -> &Arc<Mutex<SheetRegistry>> {
        &self.registry
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub async fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerMessage>) {
        self.hub.connect().await
    }

    pub async fn disconnect(&self, id: ConnectionId) {
        self.hub.disconnect(id).await
    }

    /// Handle one text frame from a connection. Frames that do not decode
    /// are dropped whole.
    pub async fn handle_text(&self, id: ConnectionId, text: &str) {
        match ClientMessage::from_text(text) {
            Ok(message) => self.handle_message(id, message).await,
            Err(error) => debug!(connection = id, %error, "Ignoring message"),
        }
    }

    /// Apply one message. The registry stays locked until the resulting
    /// diffs are queued, so every connection receives them in commit order.
    pub async fn handle_message(&self, id: ConnectionId, message: ClientMessage) {
        match message {
            ClientMessage::OpenSheet(open) => {
                let mut registry = self.registry.lock().await;
                match registry.open_sheet(&open) {
                    Ok(Some(rules_diff)) => {
                        let message = ServerMessage::rules_diff(open.name, rules_diff);
                        if let Err(error) = self.hub.send(id, message).await {
                            warn!(connection = id, %error, "Failed to send initial diff");
                        }
                    }
                    Ok(None) => {}
                    Err(error) => warn!(connection = id, sheet = %open.name, %error, "Rejected openSheet"),
                }
            }
            ClientMessage::RulesDiff { sheet_name, rules_diff } => {
                let mut registry = self.registry.lock().await;
                match registry.apply_client_diff(&sheet_name, &rules_diff) {
                    Ok(_) => {
                        let message = ServerMessage::rules_diff(sheet_name, rules_diff);
                        self.hub.broadcast(&message, Some(id)).await;
                    }
                    Err(error) => warn!(connection = id, sheet = %sheet_name, %error, "Ignoring client diff"),
                }
            }
        }
    }

    /// Reparse a sheet from new source and broadcast the resulting diff.
    ///
    /// The parse runs on the blocking pool without holding the registry;
    /// if another refresh of the same sheet starts meanwhile, this one
    /// resolves to [`UpdateOutcome::Superseded`].
    #[instrument(skip(self, source))]
    pub async fn refresh_sheet(&self, name: &str, source: String) -> StateResult<UpdateOutcome> {
        let ticket = self.registry.lock().await.begin_update(name, source)?;
        let parsing = ticket.clone();
        let parsed = tokio::task::spawn_blocking(move || parsing.parse()).await?;

        let mut registry = self.registry.lock().await;
        let outcome = registry.finish_update(ticket, parsed)?;
        if let UpdateOutcome::Changed(rules_diff) = &outcome {
            let message = ServerMessage::rules_diff(name, rules_diff.clone());
            let failed = self.hub.broadcast(&message, None).await;
            if !failed.is_empty() {
                warn!(?failed, "Dropped unreachable connections");
            }
        }
        Ok(outcome)
    }

    /// Open sheets whose source file is `path`
    pub async fn sheets_for_path(&self, path: &Path) -> Vec<String> {
        let registry = self.registry.lock().await;
        registry
            .names()
            .filter(|name| self.filter.resolve(&self.root_dir, name).as_deref() == Some(path))
            .map(str::to_string)
            .collect()
    }

    /// Re-read a changed file and refresh every sheet it backs
    pub async fn refresh_path(&self, path: &Path) {
        let names = self.sheets_for_path(path).await;
        if names.is_empty() {
            return;
        }
        let source = match tokio::fs::read_to_string(path).await {
            Ok(source) => source,
            Err(error) => {
                warn!(path = %path.display(), %error, "Failed to read sheet source");
                return;
            }
        };
        for name in names {
            match self.refresh_sheet(&name, source.clone()).await {
                Ok(UpdateOutcome::Changed(rules_diff)) => {
                    info!(sheet = %name, entries = rules_diff.len(), "Sheet updated")
                }
                Ok(outcome) => debug!(sheet = %name, ?outcome, "Sheet not updated"),
                Err(error) => warn!(sheet = %name, %error, "Refresh failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scissors_diff::{apply, RulesDiff};
    use scissors_rules::RuleTree;
    use serde_json::json;

    fn workspace() -> Workspace {
        Workspace::new(SheetRegistry::new(), PathBuf::from("/srv"), SheetFilter::default())
    }

    fn open_text(name: &str, source: Option<&str>, css_rules: serde_json::Value) -> String {
        let mut message = json!({"type": "openSheet", "name": name, "cssRules": css_rules});
        if let Some(source) = source {
            message["source"] = json!(source);
        }
        message.to_string()
    }

    #[tokio::test]
    async fn test_open_sheet_replies_to_opener_only() {
        let workspace = workspace();
        let (a, mut rx_a) = workspace.connect().await;
        let (_b, mut rx_b) = workspace.connect().await;

        workspace
            .handle_text(a, &open_text("http://x/a.css", Some("a { top: 0 }"), json!([])))
            .await;

        let ServerMessage::RulesDiff { sheet_name, rules_diff } = rx_a.recv().await.unwrap();
        assert_eq!(sheet_name, "http://x/a.css");
        let mut client = RuleTree::new();
        apply(&mut client, &rules_diff).unwrap();
        assert_eq!(client, RuleTree::from_text("a { top: 0 }").unwrap());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_frames_are_ignored() {
        let workspace = workspace();
        let (a, mut rx_a) = workspace.connect().await;
        workspace.handle_text(a, "{").await;
        workspace.handle_text(a, r#"{"type":"rulesDiff","sheetName":"x","rulesDiff":[{"bogus":1}]}"#).await;
        assert!(rx_a.try_recv().is_err());
        assert_eq!(workspace.registry().lock().await.names().count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_broadcasts_to_everyone() {
        let workspace = workspace();
        let (a, mut rx_a) = workspace.connect().await;
        let (_b, mut rx_b) = workspace.connect().await;
        workspace
            .handle_text(a, &open_text("a.css", None, json!(["a { top: 0; }"])))
            .await;

        let outcome = workspace.refresh_sheet("a.css", "a { top: 1px }".to_string()).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Changed(_)));

        let expected = RulesDiff::from_json(&json!([{"style": {"top": "1px"}}])).unwrap();
        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await, Some(ServerMessage::rules_diff("a.css", expected.clone())));
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_sends_nothing() {
        let workspace = workspace();
        let (a, mut rx_a) = workspace.connect().await;
        workspace
            .handle_text(a, &open_text("a.css", Some("a { top: 0 }"), json!(["a { top: 0; }"])))
            .await;

        let outcome = workspace.refresh_sheet("a.css", "a { top: ".to_string()).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::ParseFailed(_)));
        let outcome = workspace.refresh_sheet("a.css", "a { top: 0 }".to_string()).await.unwrap();
        assert_eq!(outcome, UpdateOutcome::Unchanged);
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_client_diff_is_relayed_to_others() {
        let workspace = workspace();
        let (a, mut rx_a) = workspace.connect().await;
        let (b, mut rx_b) = workspace.connect().await;
        workspace.handle_text(a, &open_text("a.css", None, json!(["a { top: 0; }"]))).await;
        workspace.handle_text(b, &open_text("a.css", None, json!(["a { top: 0; }"]))).await;

        let edit = json!({
            "type": "rulesDiff",
            "sheetName": "a.css",
            "rulesDiff": [{"style": {"top": "5px"}}]
        });
        workspace.handle_text(a, &edit.to_string()).await;

        let ServerMessage::RulesDiff { rules_diff, .. } = rx_b.recv().await.unwrap();
        assert_eq!(rules_diff.to_json(), json!([{"style": {"top": "5px"}}]));
        assert!(rx_a.try_recv().is_err());
        assert_eq!(
            workspace.registry().lock().await.tree("a.css"),
            Some(&RuleTree::from_text("a { top: 5px }").unwrap())
        );
    }

    #[tokio::test]
    async fn test_client_diff_that_does_not_fit_is_not_relayed() {
        let workspace = workspace();
        let (a, _rx_a) = workspace.connect().await;
        let (b, mut rx_b) = workspace.connect().await;
        let rules = json!(["a { top: 0; }", "b { top: 0; }"]);
        workspace.handle_text(a, &open_text("a.css", None, rules.clone())).await;
        workspace.handle_text(b, &open_text("a.css", None, rules)).await;

        let edit = json!({
            "type": "rulesDiff",
            "sheetName": "a.css",
            "rulesDiff": [{"style": {"top": "9px"}}, {"mediaText": "print"}]
        });
        workspace.handle_text(a, &edit.to_string()).await;

        assert!(rx_b.try_recv().is_err());
        assert_eq!(
            workspace.registry().lock().await.tree("a.css"),
            Some(&RuleTree::from_text("a { top: 0 } b { top: 0 }").unwrap())
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_refreshes_and_edits_arrive_in_commit_order() {
        let workspace = workspace();
        let (editor, _rx_editor) = workspace.connect().await;
        let (viewer, mut rx_viewer) = workspace.connect().await;
        workspace
            .handle_text(editor, &open_text("a.css", Some("a { top: 0 }"), json!(["a { top: 0; }"])))
            .await;
        workspace
            .handle_text(viewer, &open_text("a.css", None, json!(["a { top: 0; }"])))
            .await;

        let saves = {
            let workspace = workspace.clone();
            tokio::spawn(async move {
                for n in 0..40 {
                    let tail = " b { top: 0 }".repeat(n % 3);
                    let source = format!("a {{ top: {}px }}{}", n, tail);
                    workspace.refresh_sheet("a.css", source).await.unwrap();
                }
            })
        };
        let edits = {
            let workspace = workspace.clone();
            tokio::spawn(async move {
                for n in 0..40 {
                    let edit = json!({
                        "type": "rulesDiff",
                        "sheetName": "a.css",
                        "rulesDiff": [{"style": {"color": format!("#{:03}", n)}}]
                    });
                    workspace.handle_text(editor, &edit.to_string()).await;
                    tokio::task::yield_now().await;
                }
            })
        };
        saves.await.unwrap();
        edits.await.unwrap();

        let mut copy = RuleTree::from_text("a { top: 0 }").unwrap();
        while let Ok(ServerMessage::RulesDiff { rules_diff, .. }) = rx_viewer.try_recv() {
            let report = apply(&mut copy, &rules_diff).unwrap();
            assert!(report.is_clean());
        }
        assert_eq!(workspace.registry().lock().await.tree("a.css"), Some(&copy));
    }

    #[tokio::test]
    async fn test_sheets_for_path() {
        let workspace = Workspace::new(
            SheetRegistry::new(),
            PathBuf::from("/srv"),
            SheetFilter::new(Some(r"^http://localhost:\d+/(.*)$")).unwrap(),
        );
        let (a, _rx) = workspace.connect().await;
        for name in ["http://localhost:1/css/a.css", "http://elsewhere/css/a.css"] {
            workspace.handle_text(a, &open_text(name, None, json!([]))).await;
        }
        assert_eq!(
            workspace.sheets_for_path(Path::new("/srv/css/a.css")).await,
            vec!["http://localhost:1/css/a.css".to_string()]
        );
    }
}
