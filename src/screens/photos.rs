use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mutual_shared::Photo;
use tracing::{error, info};

use super::Busy;
use crate::api::{ApiClient, PhotoUpload};
use crate::error::{ClientError, ClientResult};
use crate::request::HttpClient;

pub const MAX_PHOTOS: usize = 6;
pub const MIN_PHOTOS: usize = 3;

/// The signed-in user's photos, as edited during profile setup.
pub struct PhotoGallery<C: HttpClient> {
    api: Rc<ApiClient<C>>,
    photos: RefCell<Vec<Photo>>,
    uploading: Cell<bool>,
}

impl<C: HttpClient> PhotoGallery<C> {
    pub fn new(api: Rc<ApiClient<C>>) -> Self {
        Self {
            api,
            photos: RefCell::new(Vec::new()),
            uploading: Cell::new(false),
        }
    }

    pub fn photos(&self) -> Vec<Photo> {
        self.photos.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.photos.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.borrow().is_empty()
    }

    pub fn is_uploading(&self) -> bool {
        self.uploading.get()
    }

    pub fn meets_minimum(&self) -> bool {
        self.len() >= MIN_PHOTOS
    }

    pub fn can_add(&self) -> bool {
        self.len() < MAX_PHOTOS
    }

    pub async fn load(&self) -> ClientResult<()> {
        let mut photos = self
            .api
            .my_profile()
            .await
            .map_err(|e| e.in_op("photos.load"))?
            .photos;
        photos.sort_by_key(|p| p.order_index);
        *self.photos.borrow_mut() = photos;
        Ok(())
    }

    pub async fn upload(&self, upload: &PhotoUpload) -> ClientResult<Photo> {
        if !self.can_add() {
            return Err(ClientError::invalid_input(format!(
                "You can upload up to {MAX_PHOTOS} photos."
            ))
            .in_op("photos.upload"));
        }
        let _busy = Busy::acquire(&self.uploading, "photos.upload")?;

        let photo = self.api.upload_photo(upload).await.map_err(|e| {
            error!(error = %e, "Failed to upload photo");
            e.in_op_with("photos.upload", upload.file_name.clone())
        })?;
        info!(photo_id = %photo.id, "Photo uploaded");
        self.photos.borrow_mut().push(photo.clone());
        Ok(photo)
    }

    /// Removes the photo locally only after the server confirmed the delete.
    pub async fn delete(&self, photo_id: &str) -> ClientResult<()> {
        self.api.delete_photo(photo_id).await.map_err(|e| {
            error!(photo_id, error = %e, "Failed to delete photo");
            e.in_op_with("photos.delete", photo_id)
        })?;
        self.photos.borrow_mut().retain(|p| p.id != photo_id);
        Ok(())
    }
}
