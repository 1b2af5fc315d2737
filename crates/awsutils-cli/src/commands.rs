use std::sync::Arc;

use anyhow::{Context, bail};
use awsutils_auth::Session;
use awsutils_ecs::{EcsClient, EcsTask, NetworkConfiguration};
use awsutils_s3::{
    CopyOptions, ObjectStore, S3Bucket, S3Client, S3Object, S3ObjectKeyPrefix, TimeFilter,
    sanitize_key, split_s3_url,
};
use awsutils_ssm::{ParameterStore, SsmClient};
use tracing::info;

use crate::{Command, CopyFlags, EcsCommand, ParamCommand};

impl CopyFlags {
    fn options(&self) -> CopyOptions {
        CopyOptions {
            acl: self.acl.clone(),
            abort_on_failure: self.abort_on_failure,
        }
    }
}

async fn existing_object(store: Arc<dyn ObjectStore>, url: &str) -> anyhow::Result<S3Object> {
    let object = S3Object::from_url(store, url).await?;
    if !object.exists {
        bail!("{url} does not exist");
    }
    Ok(object)
}

pub async fn run(session: Session, command: Command) -> anyhow::Result<()> {
    let store: Arc<dyn ObjectStore> = Arc::new(S3Client::new(session.clone()));

    match command {
        Command::Ls { url, window, json } => {
            let bucket = S3Bucket::from_url(store, &url).await?;
            let filter = TimeFilter::from_bounds(window.after, window.before);
            for object in bucket.list_objects(filter).await? {
                if json {
                    println!("{}", serde_json::to_string(&object)?);
                } else {
                    let modified = object
                        .last_modified
                        .map(|time| time.to_rfc3339())
                        .unwrap_or_default();
                    println!("{modified}\t{:>12}\t{}", object.size, object.key);
                }
            }
        }
        Command::Du { url } => {
            let prefix = S3ObjectKeyPrefix::from_url(store, &url).await?;
            let summary = prefix.total_size().await?;
            println!("{}\t{}\t{url}", summary.count, summary.bytes);
        }
        Command::Stat { url, event } => {
            let object = match (url, event) {
                (_, Some(path)) => {
                    let payload = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("failed to read {}", path.display()))?;
                    S3Object::from_event_bytes(store, &payload).await?
                }
                (Some(url), None) => S3Object::from_url(store, &url).await?,
                (None, None) => bail!("either a URL or --event is required"),
            };
            println!("{object}");
        }
        Command::Cp {
            source,
            target,
            copy,
            direct,
        } => {
            let object = existing_object(store, &source).await?;
            let (bucket, key) = split_s3_url(&target)?;
            if direct {
                let copied = object.copy(&bucket, &key, copy.acl.as_deref()).await?;
                info!(target = %copied.s3_url()?, "copy finished");
            } else {
                let (copied, report) = object.multipart_copy(&bucket, &key, copy.options()).await?;
                info!(
                    target = %copied.s3_url()?,
                    strategy = ?report.strategy,
                    parts = report.parts.len(),
                    "copy finished"
                );
            }
        }
        Command::Mv { url, new_key, copy } => {
            let object = existing_object(store, &url).await?;
            let renamed = object.rename(&new_key, copy.options()).await?;
            println!("{}", renamed.s3_url()?);
        }
        Command::Sanitize { url, dry_run, copy } => {
            if dry_run {
                let (_, key) = split_s3_url(&url)?;
                println!("{}", sanitize_key(&key));
            } else {
                let object = existing_object(store, &url).await?;
                let sanitized = object.sanitize(copy.options()).await?;
                println!("{}", sanitized.s3_url()?);
            }
        }
        Command::Get { url, path } => {
            let object = existing_object(store, &url).await?;
            let written = object
                .download_file(&path)
                .await
                .with_context(|| format!("failed to download {url}"))?;
            info!(path = %path.display(), bytes = written, "download finished");
        }
        Command::Put { path, url, acl } => {
            let object = S3Object::from_url(store, &url).await?;
            let uploaded = object
                .upload_file(&path, acl.as_deref())
                .await
                .with_context(|| format!("failed to upload {}", path.display()))?;
            println!("{uploaded}");
        }
        Command::RmPrefix { url } => {
            let prefix = S3ObjectKeyPrefix::from_url(store, &url).await?;
            let deleted = prefix.delete_objects().await?;
            println!("deleted {deleted} objects");
        }
        Command::Param {
            command: ParamCommand::Get { prefix, keys },
        } => {
            let parameters = ParameterStore::new(Arc::new(SsmClient::new(&session)), &prefix);
            let mut values = parameters.get_parameters(&keys).await?.into_iter().collect::<Vec<_>>();
            values.sort();
            for (key, value) in values {
                println!("{key}={value}");
            }
        }
        Command::Ecs {
            command:
                EcsCommand::Run {
                    cluster,
                    task_definition,
                    subnets,
                    security_group,
                    vpc,
                    environment,
                    command,
                },
        } => {
            let mut task = EcsTask::new(
                Arc::new(EcsClient::new(&session)),
                &task_definition,
                &cluster,
            )
            .with_network(NetworkConfiguration {
                vpc,
                subnets,
                security_group,
            })
            .with_command(command);
            for (name, value) in environment {
                task = task.with_env(name, value);
            }

            let output = task.run_fargate_task().await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            if !output.failures.is_empty() {
                bail!("{} task(s) failed to start", output.failures.len());
            }
        }
    }

    Ok(())
}
