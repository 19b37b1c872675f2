use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use aws_sdk_s3::config::Region;
use tracing::info;

use crate::services::storage::{ObjectStorages, S3ObjectStorage, StorageNode};

/// Reads `<NAME>_<ALIAS>` with `<NAME>` as the single-node fallback.
fn alias_var(name: &str, alias: &str) -> String {
    let suffix = alias.to_uppercase().replace('-', "_");
    env::var(format!("{name}_{suffix}"))
        .or_else(|_| env::var(name))
        .unwrap_or_else(|_| panic!("{name} or {name}_{suffix} must be set"))
}

/// Builds one S3 client per storage alias listed in `STORAGE_ALIASES`
/// (comma separated, default "primary"). Each alias reads its own
/// `S3_ENDPOINT_*`, `S3_ACCESS_KEY_*`, `S3_SECRET_KEY_*`, and
/// `PERMANENT_BUCKET_*` variables, falling back to the unsuffixed names
/// in single-node deployments.
pub async fn setup_object_storages() -> ObjectStorages {
    let aliases = env::var("STORAGE_ALIASES").unwrap_or_else(|_| "primary".to_string());

    let mut nodes = HashMap::new();
    for alias in aliases.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let endpoint_url = alias_var("S3_ENDPOINT", alias);
        let access_key = alias_var("S3_ACCESS_KEY", alias);
        let secret_key = alias_var("S3_SECRET_KEY", alias);
        let permanent_bucket = alias_var("PERMANENT_BUCKET", alias);

        info!(
            "☁️  S3 Storage '{}': {} (Bucket: {})",
            alias, endpoint_url, permanent_bucket
        );

        let aws_config = aws_config::from_env()
            .endpoint_url(&endpoint_url)
            .region(Region::new("us-east-1"))
            .credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key, secret_key, None, None, "static",
            ))
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(true)
            .build();

        let s3_client = aws_sdk_s3::Client::from_conf(s3_config);

        // Ensure the permanent bucket exists
        match s3_client.head_bucket().bucket(&permanent_bucket).send().await {
            Ok(_) => info!("✅ Bucket '{}' is ready", permanent_bucket),
            Err(_) => {
                info!("🪣 Bucket '{}' not found, creating...", permanent_bucket);
                if let Err(e) = s3_client
                    .create_bucket()
                    .bucket(&permanent_bucket)
                    .send()
                    .await
                {
                    tracing::error!("❌ Failed to create bucket '{}': {}", permanent_bucket, e);
                } else {
                    info!("✅ Bucket '{}' created successfully", permanent_bucket);
                }
            }
        }

        nodes.insert(
            alias.to_string(),
            StorageNode {
                permanent_bucket,
                storage: Arc::new(S3ObjectStorage::new(s3_client)),
            },
        );
    }

    info!("✅ Configured {} storage node(s)", nodes.len());
    ObjectStorages::new(nodes)
}
