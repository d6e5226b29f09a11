use axum::extract::multipart::{Multipart, MultipartRejection};
use std::collections::HashMap;

use crate::error::ApiError;
use crate::storage::FileUpload;

/// Text fields and files of a multipart body, keyed by field name.
///
/// A part counts as a file when it carries a filename. Text fields may repeat;
/// a file field may not. File parts without a filename and without content are
/// what browsers send for an untouched file input, so they are dropped.
#[derive(Debug, Default)]
pub struct FormFields {
    text: HashMap<String, Vec<String>>,
    files: HashMap<String, FileUpload>,
}

impl FormFields {
    pub async fn read(multipart: Result<Multipart, MultipartRejection>) -> Result<Self, ApiError> {
        let mut multipart =
            multipart.map_err(|e| ApiError::bad_request(format!("Expected multipart form data: {}", e)))?;
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Multipart error: {}", e)))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| {
                        ApiError::bad_request(format!("Failed to read file '{}': {}", name, e))
                    })?;
                    if filename.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    if form.files.contains_key(&name) {
                        return Err(ApiError::validation_error(
                            format!("File field '{}' supplied more than once", name),
                            None,
                        ));
                    }

                    let mut upload = FileUpload::new(bytes.to_vec(), filename);
                    if let Some(content_type) = content_type {
                        upload = upload.with_content_type(content_type);
                    }
                    form.files.insert(name, upload);
                }
                None => {
                    let value = field.text().await.map_err(|e| {
                        ApiError::bad_request(format!("Failed to read field '{}': {}", name, e))
                    })?;
                    form.text.entry(name).or_default().push(value);
                }
            }
        }

        Ok(form)
    }

    /// First value of a text field.
    pub fn text(&mut self, name: &str) -> Option<String> {
        self.text
            .remove(name)
            .and_then(|values| values.into_iter().next())
    }

    /// Every value of a repeated text field, accepting both `name` and `name[]`.
    pub fn text_list(&mut self, name: &str) -> Option<Vec<String>> {
        let mut values = self.text.remove(name);
        if let Some(bracketed) = self.text.remove(&format!("{}[]", name)) {
            values.get_or_insert_with(Vec::new).extend(bracketed);
        }
        values
    }

    pub fn file(&mut self, name: &str) -> Option<FileUpload> {
        self.files.remove(name)
    }
}
