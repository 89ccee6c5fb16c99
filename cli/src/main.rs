mod logging;

use std::{error::Error, sync::Arc};

use async_std::io::{WriteExt, stdin, stdout};
use clap::{Parser, Subcommand};
use core_types::ContentUri;
use database::{
    clock::{Clock, SystemClock},
    models::{DeletionRequest, UploadEnqueueRequest},
};
use media_store::{
    ConsentKind, fs::FileSystemMediaStore, permission::AlwaysGranted, platform::PlatformVersion,
};
use service::{
    app_services::{AppServices, Platform, create_app_services},
    deletion::{
        analytics::DeletionAnalytics,
        model::{DEFAULT_CHUNK_SIZE, RESULT_CANCELED, RESULT_OK},
        view_model::DeletionConfirmationEvent,
    },
};

const MANUAL_REASON: &str = "manual";
const DAY_MS: i64 = 24 * 60 * 60 * 1_000;

#[derive(Parser, Debug)]
#[command(name = "uploader", about = "Photo upload queue and deletion confirmation")]
struct Cli {
    /// API level of the platform the media store rules follow
    #[arg(long, default_value_t = 29)]
    platform_version: PlatformVersion,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deletion queue
    #[command(subcommand)]
    Deletion(DeletionCommand),
    /// Upload queue
    #[command(subcommand)]
    Upload(UploadCommand),
    /// Preferences
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
enum DeletionCommand {
    /// List pending deletions
    List,
    /// Queue a media item for deletion
    Enqueue {
        #[arg(long)]
        media_id: i64,
        #[arg(long)]
        uri: String,
        #[arg(long)]
        size: Option<i64>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Remove finished entries
    Purge {
        /// Keep entries younger than this many days
        #[arg(long)]
        days: Option<i64>,
    },
    /// Delete the pending items, asking for consent on the terminal
    Confirm {
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },
    /// Drop pending items that are gone from the media store
    Reconcile,
}

#[derive(Subcommand, Debug)]
enum UploadCommand {
    /// Queue a photo for upload
    Enqueue {
        #[arg(long)]
        uri: String,
        #[arg(long)]
        photo_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        size: Option<i64>,
        /// Idempotency key sent with the upload, defaults to the photo id
        #[arg(long)]
        key: Option<String>,
    },
    /// Show queue counters
    Stats,
    /// Put every processing item back in the queue
    Recover,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    SetAutoDelete {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    SetWifiOnly {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let _guard = logging::init_logging();
    let args = Cli::parse();
    tracing::debug!(?args, "Arguments parsed");

    async_std::task::block_on(async move {
        let services = create_app_services(Platform {
            media_store: Arc::new(FileSystemMediaStore::new()),
            permissions: Arc::new(AlwaysGranted),
            platform_version: args.platform_version,
        })
        .await?;

        match args.command {
            Command::Deletion(command) => run_deletion(&services, command).await,
            Command::Upload(command) => run_upload(&services, command).await,
            Command::Settings(command) => run_settings(&services, command).await,
        }
    })
}

async fn run_deletion(
    services: &AppServices,
    command: DeletionCommand,
) -> Result<(), Box<dyn Error>> {
    let repository = services.repository_manager().get_deletion_queue_repository();
    match command {
        DeletionCommand::List => {
            let pending = repository.get_pending().await?;
            if pending.is_empty() {
                println!("No pending deletions");
            }
            for item in pending {
                println!(
                    "{}\t{}\t{}\t{}{}",
                    item.media_id,
                    item.content_uri,
                    item.size_bytes
                        .map(|size| size.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    item.display_name.unwrap_or_default(),
                    if item.is_uploading { "\t(uploading)" } else { "" }
                );
            }
        }
        DeletionCommand::Enqueue {
            media_id,
            uri,
            size,
            name,
        } => {
            let uri = ContentUri::parse(&uri)?;
            let inserted = repository
                .enqueue(&[DeletionRequest {
                    media_id,
                    content_uri: uri.to_string(),
                    display_name: name,
                    size_bytes: size,
                    date_taken: None,
                    reason: MANUAL_REASON.to_string(),
                }])
                .await?;
            if inserted > 0 {
                services.analytics().deletion_enqueued(inserted);
            }
            println!("Queued {} item(s)", inserted);
        }
        DeletionCommand::Purge { days } => {
            let removed = match days {
                Some(days) => {
                    repository
                        .purge(SystemClock.now_millis() - days * DAY_MS)
                        .await?
                }
                None => repository.purge_default().await?,
            };
            println!("Removed {} entries", removed);
        }
        DeletionCommand::Confirm { chunk_size } => confirm(services, chunk_size).await?,
        DeletionCommand::Reconcile => {
            let skipped = services.confirm_deletion().reconcile_pending().await?;
            println!("{} item(s) were already gone", skipped);
        }
    }
    Ok(())
}

async fn confirm(services: &AppServices, chunk_size: usize) -> Result<(), Box<dyn Error>> {
    let (view_model, events) = services.deletion_view_model(chunk_size).await;
    let state = view_model.ui_state();
    if !state.is_confirm_enabled() {
        println!("Nothing to delete");
        return Ok(());
    }
    println!(
        "{} item(s) pending, about {} bytes",
        state.pending_count, state.pending_bytes_approx
    );

    let media_store = FileSystemMediaStore::new();
    view_model.confirm_pending().await;
    loop {
        let event = match events.try_recv() {
            Ok(event) => event,
            Err(_) if !view_model.ui_state().in_progress => break,
            Err(_) => events.recv().await?,
        };

        match event {
            DeletionConfirmationEvent::RequestPermission(permissions) => {
                let permissions = permissions.into_iter().collect::<Vec<_>>().join(", ");
                let granted = ask(&format!("Grant {}?", permissions)).await?;
                view_model.handle_permission_result(granted).await;
            }
            DeletionConfirmationEvent::LaunchBatch(batch) => {
                let question = match batch.action.kind {
                    ConsentKind::DeleteRequest => {
                        format!("Delete {} item(s)?", batch.action.uris.len())
                    }
                    ConsentKind::RecoverableSecurity => {
                        format!("Allow changes to {}?", batch.action.uris.join(", "))
                    }
                };
                let mut result_code = RESULT_CANCELED;
                if ask(&question).await? {
                    match media_store.apply_consent(&batch.action).await {
                        Ok(()) => result_code = RESULT_OK,
                        Err(e) => eprintln!("Could not apply consent: {}", e),
                    }
                }
                view_model
                    .handle_batch_result(&batch, result_code, None)
                    .await;
            }
            DeletionConfirmationEvent::FinalSuccess {
                confirmed_count,
                freed_bytes,
                failed_count,
                skipped_count,
            } => {
                println!(
                    "Deleted {} item(s), freed {} bytes ({} failed, {} skipped)",
                    confirmed_count, freed_bytes, failed_count, skipped_count
                );
            }
            DeletionConfirmationEvent::FinalFailure(error) => {
                println!("Deletion stopped: {}", error);
            }
        }
    }
    Ok(())
}

async fn ask(question: &str) -> std::io::Result<bool> {
    let mut out = stdout();
    out.write_all(format!("{} [y/N] ", question).as_bytes())
        .await?;
    out.flush().await?;
    let mut answer = String::new();
    stdin().read_line(&mut answer).await?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

async fn run_upload(services: &AppServices, command: UploadCommand) -> Result<(), Box<dyn Error>> {
    let repository = services.repository_manager().get_upload_queue_repository();
    match command {
        UploadCommand::Enqueue {
            uri,
            photo_id,
            name,
            size,
            key,
        } => {
            let uri = ContentUri::parse(&uri)?;
            let idempotency_key = key.unwrap_or_else(|| photo_id.clone());
            let id = repository
                .enqueue(UploadEnqueueRequest {
                    uri: &uri,
                    idempotency_key: &idempotency_key,
                    photo_id: Some(&photo_id),
                    display_name: name.as_deref(),
                    size,
                })
                .await?;
            println!("Queued upload item {}", id);
        }
        UploadCommand::Stats => {
            let stats = repository.get_queue_stats().await?;
            println!("queued:     {}", stats.queued);
            println!("processing: {}", stats.processing);
            println!("succeeded:  {} (last 24h)", stats.succeeded);
            println!("failed:     {}", stats.failed);
        }
        UploadCommand::Recover => {
            let requeued = repository.requeue_all_processing().await?;
            println!("Requeued {} item(s)", requeued);
        }
    }
    Ok(())
}

async fn run_settings(
    services: &AppServices,
    command: SettingsCommand,
) -> Result<(), Box<dyn Error>> {
    let settings_service = services.settings();
    match command {
        SettingsCommand::Show => {
            let settings = settings_service.load_settings().await?;
            println!(
                "auto_delete_after_upload: {}",
                settings.auto_delete_after_upload
            );
            println!("wifi_only_uploads:        {}", settings.wifi_only_uploads);
        }
        SettingsCommand::SetAutoDelete { enabled } => {
            settings_service.set_auto_delete_after_upload(enabled).await?
        }
        SettingsCommand::SetWifiOnly { enabled } => {
            settings_service.set_wifi_only_uploads(enabled).await?
        }
    }
    Ok(())
}
