//! User actions and the state transitions they drive.

use crate::error::{Precondition, Result};
use crate::image::{ImageService, RawImage};
use crate::studio::session::{Operation, Session};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// How an action ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum ActionOutcome {
    /// A precondition failed; nothing was cleared or invoked.
    Rejected(Precondition),
    /// The service succeeded and its results were stored.
    Completed,
    /// The service failed and the error message was stored.
    Failed,
}

/// Runs user actions against a shared [`Session`] through an [`ImageService`].
///
/// Each action locks the session twice: once to validate its inputs, clear
/// previous results and mark its operation busy, and once to store the
/// results or the error message and unmark. The lock is never held while
/// the service call is suspended, so readers see the busy flag and other
/// operations may run alongside. The busy flag is cleared on every exit
/// path, including when the action future is dropped before completion.
pub struct Studio<S> {
    service: S,
}

impl<S: ImageService> Studio<S> {
    /// Creates a studio around an image service.
    pub fn new(service: S) -> Self {
        Self { service }
    }

    /// Returns the underlying service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Loads a new source image, replacing any previous one.
    pub fn upload(&self, session: &Mutex<Session>, image: RawImage) {
        tracing::debug!(mime_type = image.mime_type(), "source image loaded");
        let mut session = lock(session);
        session.replace_source(image);
        session.clear_results();
    }

    /// Removes the source image. Returns false, touching nothing, if none
    /// was loaded.
    pub fn remove_source(&self, session: &Mutex<Session>) -> bool {
        let mut session = lock(session);
        if !session.release_source() {
            return false;
        }
        session.clear_results();
        true
    }

    /// Generates four images from the session prompt.
    pub async fn generate(&self, session: &Mutex<Session>) -> ActionOutcome {
        let (run, prompt) = match InFlight::begin(session, Operation::Generate, |s| {
            prompt_of(s).ok_or(Precondition::MissingPrompt)
        }) {
            Ok(started) => started,
            Err(rejected) => return rejected,
        };

        let result = self.service.generate_from_text(&prompt).await;
        run.finish(result, Session::set_generated)
    }

    /// Edits the source image according to the session prompt.
    pub async fn edit(&self, session: &Mutex<Session>) -> ActionOutcome {
        let (run, (source, prompt)) = match InFlight::begin(session, Operation::Edit, |s| {
            let source = source_of(s).ok_or(Precondition::MissingSourceImage)?;
            let prompt = prompt_of(s).ok_or(Precondition::MissingEditPrompt)?;
            Ok((source, prompt))
        }) {
            Ok(started) => started,
            Err(rejected) => return rejected,
        };

        let result = self.service.edit_with_prompt(&prompt, &source).await;
        run.finish(result, Session::set_generated)
    }

    /// Removes the background of the source image.
    pub async fn remove_background(&self, session: &Mutex<Session>) -> ActionOutcome {
        let (run, source) = match InFlight::begin(session, Operation::RemoveBackground, |s| {
            source_of(s).ok_or(Precondition::MissingSourceImage)
        }) {
            Ok(started) => started,
            Err(rejected) => return rejected,
        };

        let result = self.service.remove_background(&source).await;
        run.finish(result, Session::set_background_removed)
    }

    /// Enhances the source image.
    pub async fn enhance(&self, session: &Mutex<Session>) -> ActionOutcome {
        let (run, source) = match InFlight::begin(session, Operation::Enhance, |s| {
            source_of(s).ok_or(Precondition::MissingSourceImage)
        }) {
            Ok(started) => started,
            Err(rejected) => return rejected,
        };

        let result = self.service.enhance(&source).await;
        run.finish(result, Session::set_enhanced)
    }

    /// Runs `op`, dispatching to the matching action.
    pub async fn run(&self, session: &Mutex<Session>, op: Operation) -> ActionOutcome {
        match op {
            Operation::Generate => self.generate(session).await,
            Operation::Edit => self.edit(session).await,
            Operation::RemoveBackground => self.remove_background(session).await,
            Operation::Enhance => self.enhance(session).await,
        }
    }
}

/// Session state is plain data, so a panic elsewhere leaves it usable.
fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Only an empty prompt counts as missing; whitespace is sent as typed.
fn prompt_of(session: &Session) -> Option<String> {
    let prompt = session.prompt();
    (!prompt.is_empty()).then(|| prompt.to_string())
}

fn source_of(session: &Session) -> Option<RawImage> {
    session.source().map(|s| s.raw().clone())
}

/// Busy marker for one running operation; unmarks on drop.
struct InFlight<'a> {
    session: &'a Mutex<Session>,
    op: Operation,
}

impl<'a> InFlight<'a> {
    /// Validates with `inputs`, then clears results and marks `op` busy,
    /// all under one lock.
    fn begin<T>(
        session: &'a Mutex<Session>,
        op: Operation,
        inputs: impl FnOnce(&Session) -> std::result::Result<T, Precondition>,
    ) -> std::result::Result<(Self, T), ActionOutcome> {
        let mut guard = lock(session);
        let inputs = match inputs(&*guard) {
            Ok(inputs) => inputs,
            Err(precondition) => {
                tracing::debug!(operation = %op, reason = %precondition, "action rejected");
                guard.set_error(precondition.to_string());
                return Err(ActionOutcome::Rejected(precondition));
            }
        };
        guard.clear_results();
        guard.set_busy(op, true);
        tracing::info!(operation = %op, "operation started");
        Ok((Self { session, op }, inputs))
    }

    /// Stores the results or the error message. The busy flag is unmarked
    /// when `self` drops, after the lock is released.
    fn finish<T>(self, result: Result<T>, store: fn(&mut Session, T)) -> ActionOutcome {
        let mut guard = lock(self.session);
        let outcome = match result {
            Ok(value) => {
                store(&mut *guard, value);
                tracing::info!(operation = %self.op, "operation completed");
                ActionOutcome::Completed
            }
            Err(e) => {
                guard.set_error(e.to_string());
                tracing::info!(operation = %self.op, error = %e, "operation failed");
                ActionOutcome::Failed
            }
        };
        drop(guard);
        outcome
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.session).set_busy(self.op, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StudioError;
    use crate::image::{
        BatchRequest, EditRequest, ImageBackend, ResultImage, StudioClient, BATCH_SIZE,
    };
    use crate::studio::BusyFlags;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct StubService {
        fail: bool,
        hang: bool,
        calls: AtomicUsize,
        /// Session whose busy flags are recorded on every call.
        observed: Option<Arc<Mutex<Session>>>,
        seen: Mutex<Vec<BusyFlags>>,
    }

    impl StubService {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn observing(session: &Arc<Mutex<Session>>) -> Self {
            Self {
                observed: Some(Arc::clone(session)),
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn seen(&self) -> Vec<BusyFlags> {
            self.seen.lock().unwrap().clone()
        }

        async fn respond<T>(&self, value: T, wrapper: fn(Box<StudioError>) -> StudioError) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(session) = &self.observed {
                let busy = session.lock().unwrap().busy();
                self.seen.lock().unwrap().push(busy);
                tokio::task::yield_now().await;
            }
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(wrapper(Box::new(StudioError::Api {
                    status: 503,
                    message: "unavailable".into(),
                })));
            }
            Ok(value)
        }
    }

    fn image(tag: &str) -> ResultImage {
        ResultImage::embedded("image/png", tag)
    }

    #[async_trait]
    impl ImageService for StubService {
        async fn generate_from_text(&self, _prompt: &str) -> Result<Vec<ResultImage>> {
            self.respond(vec![image("g"); BATCH_SIZE], StudioError::Generation).await
        }

        async fn edit_with_prompt(&self, _prompt: &str, _source: &RawImage) -> Result<Vec<ResultImage>> {
            self.respond(vec![image("e"); BATCH_SIZE], StudioError::Edit).await
        }

        async fn remove_background(&self, _source: &RawImage) -> Result<ResultImage> {
            self.respond(image("bg"), StudioError::BackgroundRemoval).await
        }

        async fn enhance(&self, _source: &RawImage) -> Result<ResultImage> {
            self.respond(image("hd"), StudioError::Enhance).await
        }
    }

    fn loaded_session(studio: &Studio<impl ImageService>, prompt: &str) -> Mutex<Session> {
        let mut session = Session::new();
        session.set_prompt(prompt);
        let session = Mutex::new(session);
        studio.upload(&session, RawImage::from_bytes(b"px".to_vec(), "image/png"));
        session
    }

    fn prompted(prompt: &str) -> Mutex<Session> {
        let mut session = Session::new();
        session.set_prompt(prompt);
        Mutex::new(session)
    }

    #[tokio::test]
    async fn test_failing_service_clears_busy_and_sets_error() {
        let studio = Studio::new(StubService::failing());

        for op in Operation::ALL {
            let session = loaded_session(&studio, "a prompt");
            let outcome = studio.run(&session, op).await;

            let session = lock(&session);
            assert_eq!(outcome, ActionOutcome::Failed, "{op}");
            assert!(!session.busy().get(op), "{op}");
            assert!(!session.busy().any(), "{op}");
            assert!(!session.error().unwrap_or_default().is_empty(), "{op}");
            assert!(session.generated().is_empty(), "{op}");
        }
        assert_eq!(studio.service().calls(), 4);
    }

    #[tokio::test]
    async fn test_failure_message_is_operation_message() {
        let studio = Studio::new(StubService::failing());
        let session = loaded_session(&studio, "x");

        let _ = studio.remove_background(&session).await;
        assert_eq!(
            lock(&session).error(),
            Some("Could not remove the image background.")
        );
    }

    #[tokio::test]
    async fn test_generate_without_prompt_never_calls_service() {
        let studio = Studio::new(StubService::default());
        let session = prompted("");

        let outcome = studio.generate(&session).await;
        assert_eq!(outcome, ActionOutcome::Rejected(Precondition::MissingPrompt));
        assert_eq!(lock(&session).error(), Some("Please enter a prompt."));
        assert_eq!(studio.service().calls(), 0);
        assert!(!lock(&session).busy().any());
    }

    #[tokio::test]
    async fn test_whitespace_prompt_is_sent_as_typed() {
        let studio = Studio::new(StubService::default());
        let session = prompted(" ");

        assert_eq!(studio.generate(&session).await, ActionOutcome::Completed);
        assert_eq!(studio.service().calls(), 1);
        assert!(lock(&session).error().is_none());
    }

    #[tokio::test]
    async fn test_edit_preconditions_never_call_service() {
        let studio = Studio::new(StubService::default());

        let with_image = loaded_session(&studio, "");
        let outcome = studio.edit(&with_image).await;
        assert_eq!(outcome, ActionOutcome::Rejected(Precondition::MissingEditPrompt));

        let with_prompt = prompted("make it blue");
        let outcome = studio.edit(&with_prompt).await;
        assert_eq!(outcome, ActionOutcome::Rejected(Precondition::MissingSourceImage));
        assert_eq!(lock(&with_prompt).error(), Some("Please upload a source image."));

        assert_eq!(studio.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_image_actions_require_source() {
        let studio = Studio::new(StubService::default());
        let session = prompted("ignored");

        for op in [Operation::RemoveBackground, Operation::Enhance] {
            let outcome = studio.run(&session, op).await;
            assert_eq!(outcome, ActionOutcome::Rejected(Precondition::MissingSourceImage));
        }
        assert_eq!(studio.service().calls(), 0);
    }

    #[tokio::test]
    async fn test_rejection_keeps_previous_results() {
        let studio = Studio::new(StubService::default());
        let session = prompted("a cat");
        assert_eq!(studio.generate(&session).await, ActionOutcome::Completed);

        lock(&session).set_prompt("");
        let _ = studio.generate(&session).await;
        assert_eq!(lock(&session).generated().len(), BATCH_SIZE);
        assert!(lock(&session).error().is_some());
    }

    #[tokio::test]
    async fn test_start_clears_all_result_slots() {
        let studio = Studio::new(StubService::default());
        let session = loaded_session(&studio, "a cat");

        assert_eq!(studio.generate(&session).await, ActionOutcome::Completed);
        assert_eq!(lock(&session).generated().len(), BATCH_SIZE);
        assert_eq!(studio.enhance(&session).await, ActionOutcome::Completed);
        assert!(lock(&session).generated().is_empty());
        assert!(lock(&session).enhanced().is_some());

        lock(&session).set_error("stale");
        assert_eq!(
            studio.remove_background(&session).await,
            ActionOutcome::Completed
        );
        let session = lock(&session);
        assert_eq!(session.background_removed(), Some(&image("bg")));
        assert!(session.enhanced().is_none());
        assert!(session.generated().is_empty());
        assert!(session.error().is_none());
    }

    #[tokio::test]
    async fn test_failure_after_success_shows_no_stale_results() {
        let ok = Studio::new(StubService::default());
        let session = loaded_session(&ok, "a cat");
        let _ = ok.edit(&session).await;
        assert_eq!(lock(&session).generated().len(), BATCH_SIZE);

        let failing = Studio::new(StubService::failing());
        let _ = failing.edit(&session).await;
        assert!(lock(&session).generated().is_empty());
        assert_eq!(
            lock(&session).error(),
            Some("Could not edit the image with the prompt.")
        );
    }

    #[tokio::test]
    async fn test_busy_flag_visible_while_call_suspended() {
        let session = Arc::new(Mutex::new(Session::new()));
        lock(&session).set_prompt("a cat");
        let studio = Studio::new(StubService::observing(&session));
        studio.upload(&session, RawImage::from_bytes(b"px".to_vec(), "image/png"));

        for op in Operation::ALL {
            assert_eq!(studio.run(&session, op).await, ActionOutcome::Completed);
            assert!(!lock(&session).busy().any(), "{op}");
        }

        let seen = studio.service().seen();
        assert_eq!(seen.len(), Operation::ALL.len());
        for (flags, op) in seen.iter().zip(Operation::ALL) {
            assert!(flags.get(op), "{op}");
            assert_eq!(
                Operation::ALL.iter().filter(|o| flags.get(**o)).count(),
                1,
                "{op}"
            );
        }
    }

    #[tokio::test]
    async fn test_distinct_operations_run_concurrently() {
        let session = Arc::new(Mutex::new(Session::new()));
        lock(&session).set_prompt("a cat");
        let studio = Studio::new(StubService::observing(&session));
        studio.upload(&session, RawImage::from_bytes(b"px".to_vec(), "image/png"));

        let (generated, enhanced) =
            tokio::join!(studio.generate(&session), studio.enhance(&session));
        assert_eq!(generated, ActionOutcome::Completed);
        assert_eq!(enhanced, ActionOutcome::Completed);

        let both_busy = studio
            .service()
            .seen()
            .iter()
            .any(|flags| flags.generating && flags.enhancing);
        assert!(both_busy);

        let session = lock(&session);
        assert!(!session.busy().any());
        assert_eq!(session.generated().len(), BATCH_SIZE);
        assert_eq!(session.enhanced(), Some(&image("hd")));
    }

    #[tokio::test]
    async fn test_dropped_action_clears_busy_flag() {
        let studio = Studio::new(StubService {
            hang: true,
            ..Default::default()
        });
        let session = loaded_session(&studio, "a cat");

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), studio.enhance(&session)).await;
        assert!(timed_out.is_err());
        assert!(!lock(&session).busy().enhancing);
        assert_eq!(studio.service().calls(), 1);
    }

    #[test]
    fn test_upload_and_remove_source() {
        let studio = Studio::new(StubService::default());
        let session = loaded_session(&studio, "a cat");
        assert_eq!(lock(&session).previews().live(), 1);

        studio.upload(&session, RawImage::from_path("other.webp"));
        assert_eq!(lock(&session).previews().live(), 1);
        assert_eq!(lock(&session).source().unwrap().mime_type(), "image/webp");

        assert!(studio.remove_source(&session));
        assert!(lock(&session).source().is_none());
        assert_eq!(lock(&session).previews().live(), 0);
    }

    #[tokio::test]
    async fn test_upload_clears_results() {
        let studio = Studio::new(StubService::default());
        let session = loaded_session(&studio, "a cat");
        let _ = studio.generate(&session).await;

        studio.upload(&session, RawImage::from_path("next.png"));
        assert!(lock(&session).generated().is_empty());
    }

    #[tokio::test]
    async fn test_remove_source_when_empty_is_noop() {
        let studio = Studio::new(StubService::default());
        let session = prompted("a cat");
        let _ = studio.generate(&session).await;

        assert!(!studio.remove_source(&session));
        assert!(lock(&session).error().is_none());
        assert_eq!(lock(&session).generated().len(), BATCH_SIZE);
    }

    /// Backend returning fixed payloads, failing one edit call in four.
    #[derive(Default)]
    struct FlakyBackend {
        edit_calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageBackend for FlakyBackend {
        async fn generate_batch(&self, request: &BatchRequest) -> Result<Vec<String>> {
            Ok((0..request.count).map(|i| format!("cGF5bG9hZA{i}")).collect())
        }

        async fn edit_single(&self, _request: &EditRequest) -> Result<ResultImage> {
            if self.edit_calls.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(StudioError::NoImageInResponse);
            }
            Ok(image("edit"))
        }

        fn name(&self) -> &str {
            "flaky"
        }

        async fn health_check(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_generate_red_balloon_yields_four_jpeg_handles() {
        let studio = Studio::new(StudioClient::new(FlakyBackend::default()));
        let session = prompted("a red balloon");

        assert_eq!(studio.generate(&session).await, ActionOutcome::Completed);
        let session = lock(&session);
        assert_eq!(session.generated().len(), 4);
        for handle in session.generated().iter().map(ResultImage::display_handle) {
            assert!(handle.starts_with("data:image/jpeg;base64,"), "{handle}");
        }
    }

    #[tokio::test]
    async fn test_edit_with_one_failed_call_writes_no_results() {
        let client = Arc::new(StudioClient::new(FlakyBackend::default()));
        let studio = Studio::new(Arc::clone(&client));
        let session = loaded_session(&studio, "make it blue");

        assert_eq!(studio.edit(&session).await, ActionOutcome::Failed);
        let session = lock(&session);
        assert!(session.generated().is_empty());
        assert_eq!(session.error(), Some("Could not edit the image with the prompt."));
        assert!(!session.busy().editing);
        assert!(client.backend().edit_calls.load(Ordering::SeqCst) >= 2);
    }
}
