use core_types::ContentUri;
use database::models::DeletionRequest;

use crate::{
    error::Error,
    pipeline::pipeline_step::{PipelineStep, StepAction},
    upload_cleanup::{
        context::CleanupContext,
        media_id::{extract_media_id, media_id_from_uri},
        model::{CleanupResult, SkipReason, UPLOADED_CLEANUP_REASON},
    },
};

/// Step 1: Load the current settings
pub struct LoadSettingsStep;

#[async_trait::async_trait]
impl PipelineStep<CleanupContext> for LoadSettingsStep {
    fn name(&self) -> &'static str {
        "load_settings"
    }

    async fn execute(&self, context: &mut CleanupContext) -> StepAction {
        match context.settings_service.load_settings().await {
            Ok(settings) => {
                context.settings = Some(settings);
                StepAction::Continue
            }
            Err(e) => {
                context.fail(SkipReason::SettingsError, e);
                StepAction::Skip
            }
        }
    }
}

/// Step 2: Stop when deleting after upload is turned off
pub struct CheckAutoDeleteStep;

#[async_trait::async_trait]
impl PipelineStep<CleanupContext> for CheckAutoDeleteStep {
    fn name(&self) -> &'static str {
        "check_auto_delete"
    }

    async fn execute(&self, context: &mut CleanupContext) -> StepAction {
        let enabled = context
            .settings
            .map(|settings| settings.auto_delete_after_upload)
            .unwrap_or(false);
        if enabled {
            StepAction::Continue
        } else {
            context.skip(SkipReason::SettingsDisabled);
            StepAction::Skip
        }
    }
}

/// Step 3: Stop when this upload item was already handed over
pub struct CheckAlreadyHandledStep;

#[async_trait::async_trait]
impl PipelineStep<CleanupContext> for CheckAlreadyHandledStep {
    fn name(&self) -> &'static str {
        "check_already_handled"
    }

    async fn execute(&self, context: &mut CleanupContext) -> StepAction {
        if context.handled_items.try_reserve(context.upload.item_id) {
            context.reserved = true;
            StepAction::Continue
        } else {
            context.skip(SkipReason::AlreadyProcessed);
            StepAction::Skip
        }
    }
}

/// Step 4: Look up the photo record behind the upload item
pub struct LookupSourceStep;

#[async_trait::async_trait]
impl PipelineStep<CleanupContext> for LookupSourceStep {
    fn name(&self) -> &'static str {
        "lookup_source"
    }

    async fn execute(&self, context: &mut CleanupContext) -> StepAction {
        let result = context
            .repository_manager
            .get_upload_queue_repository()
            .find_source_for_item(context.upload.item_id)
            .await;
        match result {
            Ok(source) => {
                context.source = source;
                StepAction::Continue
            }
            Err(e) => {
                context.fail(SkipReason::SourceLookupFailed, Error::from(e));
                StepAction::Skip
            }
        }
    }
}

/// Step 5: Pick the URI of the original, preferring the photo record
pub struct ResolveContentUriStep;

#[async_trait::async_trait]
impl PipelineStep<CleanupContext> for ResolveContentUriStep {
    fn name(&self) -> &'static str {
        "resolve_content_uri"
    }

    async fn execute(&self, context: &mut CleanupContext) -> StepAction {
        let content_uri = context
            .source
            .as_ref()
            .and_then(|source| source.uri.clone())
            .or_else(|| {
                context
                    .upload
                    .upload_uri
                    .as_deref()
                    .and_then(|raw| ContentUri::parse(raw).ok())
            });
        match content_uri {
            Some(uri) => {
                context.content_uri = Some(uri);
                StepAction::Continue
            }
            None => {
                context.skip(SkipReason::MissingContentUri);
                StepAction::Skip
            }
        }
    }
}

/// Step 6: Find the media id of the original
pub struct ResolveMediaIdStep;

#[async_trait::async_trait]
impl PipelineStep<CleanupContext> for ResolveMediaIdStep {
    fn name(&self) -> &'static str {
        "resolve_media_id"
    }

    async fn execute(&self, context: &mut CleanupContext) -> StepAction {
        let from_upload_uri = context.upload.upload_uri.as_deref().and_then(|raw| {
            ContentUri::parse(raw)
                .ok()
                .and_then(|uri| media_id_from_uri(&uri))
                .or_else(|| extract_media_id(raw))
        });
        let media_id = from_upload_uri
            .or_else(|| {
                context
                    .source
                    .as_ref()
                    .and_then(|source| extract_media_id(&source.photo_id))
            })
            .or_else(|| {
                context
                    .source
                    .as_ref()
                    .and_then(|source| source.uri.as_ref())
                    .and_then(media_id_from_uri)
            })
            .or_else(|| context.content_uri.as_ref().and_then(media_id_from_uri));

        match media_id {
            Some(media_id) => {
                context.media_id = Some(media_id);
                StepAction::Continue
            }
            None => {
                context.skip(SkipReason::MissingMediaId);
                StepAction::Skip
            }
        }
    }
}

/// Step 7: Put the original on the deletion queue
pub struct EnqueueDeletionStep;

#[async_trait::async_trait]
impl PipelineStep<CleanupContext> for EnqueueDeletionStep {
    fn name(&self) -> &'static str {
        "enqueue_deletion"
    }

    fn should_execute(&self, context: &CleanupContext) -> bool {
        context.media_id.is_some() && context.content_uri.is_some()
    }

    async fn execute(&self, context: &mut CleanupContext) -> StepAction {
        let (Some(media_id), Some(content_uri)) = (context.media_id, context.content_uri.as_ref())
        else {
            return StepAction::Continue;
        };
        let size_bytes = context
            .upload
            .reported_size_bytes
            .filter(|size| *size > 0)
            .or_else(|| context.source.as_ref().and_then(|source| source.size_bytes));
        let request = DeletionRequest {
            media_id,
            content_uri: content_uri.as_str().to_string(),
            display_name: context.upload.display_name.clone(),
            size_bytes,
            date_taken: None,
            reason: UPLOADED_CLEANUP_REASON.to_string(),
        };

        let result = context
            .repository_manager
            .get_deletion_queue_repository()
            .enqueue(&[request])
            .await;
        match result {
            Err(e) => {
                context.fail(SkipReason::EnqueueError, Error::from(e));
            }
            Ok(0) => {
                context.handled_items.mark(context.upload.item_id);
                context.skip(SkipReason::EnqueueDuplicate);
            }
            Ok(inserted) => {
                context.handled_items.mark(context.upload.item_id);
                context.analytics.deletion_enqueued(inserted);
                tracing::info!(
                    item_id = context.upload.item_id,
                    media_id,
                    "Original queued for deletion after upload"
                );
                context.result = Some(CleanupResult::Success {
                    media_id,
                    enqueued_count: inserted,
                });
            }
        }
        StepAction::Skip
    }
}
