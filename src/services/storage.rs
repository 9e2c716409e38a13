use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Tag, Tagging};
use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left as-is when a key is placed in a URL path
const KEY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A listed object
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
}

impl ObjectSummary {
    /// Zero-byte "folder" placeholders created by consoles and sync tools
    pub fn is_directory_marker(&self) -> bool {
        self.size == 0 || self.key.ends_with('/')
    }
}

#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload_file(&self, key: &str, data: Bytes, content_type: &str) -> Result<()>;
    async fn delete_file(&self, key: &str) -> Result<()>;
    async fn file_exists(&self, key: &str) -> Result<bool>;
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>>;
    /// Tag keys of an object. An object without a tag set yields an empty list.
    async fn get_object_tags(&self, key: &str) -> Result<Vec<String>>;
    /// Replace the tag set of an object, each tag stored as key = value
    async fn put_object_tags(&self, key: &str, tags: &[String]) -> Result<()>;
    fn public_url(&self, key: &str) -> String;
    async fn health_check(&self) -> bool;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket,
            public_base_url,
        }
    }
}

/// Join a base URL and an object key, escaping the key
pub fn build_public_url(base: &str, key: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        utf8_percent_encode(key, KEY_ENCODE_SET)
    )
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload_file(&self, key: &str, data: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await?;
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await?;

            if let Some(contents) = res.contents {
                for object in contents {
                    if let Some(key) = object.key {
                        objects.push(ObjectSummary {
                            key,
                            size: object.size.unwrap_or(0),
                        });
                    }
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn get_object_tags(&self, key: &str) -> Result<Vec<String>> {
        let res = self
            .client
            .get_object_tagging()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(output) => Ok(output
                .tag_set()
                .iter()
                .map(|t| t.key().to_lowercase())
                .collect()),
            Err(e) => {
                let service_error = e.into_service_error();
                // MinIO and some S3 clones report untagged objects this way
                if service_error.code() == Some("NoSuchTagSet") {
                    Ok(Vec::new())
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }

    async fn put_object_tags(&self, key: &str, tags: &[String]) -> Result<()> {
        let tag_set = tags
            .iter()
            .map(|t| Tag::builder().key(t).value(t).build())
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .put_object_tagging()
            .bucket(&self.bucket)
            .key(key)
            .tagging(Tagging::builder().set_tag_set(Some(tag_set)).build()?)
            .send()
            .await?;
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        build_public_url(&self.public_base_url, key)
    }

    async fn health_check(&self) -> bool {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .is_ok()
    }
}
