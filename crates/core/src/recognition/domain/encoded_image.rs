/// A still frame ready for transport: a `data:<mime>;base64,<payload>` URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    data_url: String,
    width: u32,
    height: u32,
}

impl EncodedImage {
    pub fn new(data_url: String, width: u32, height: u32) -> Self {
        Self {
            data_url,
            width,
            height,
        }
    }

    pub fn as_data_url(&self) -> &str {
        &self.data_url
    }

    /// MIME type declared in the URL header, e.g. `image/jpeg`.
    pub fn mime_type(&self) -> Option<&str> {
        let header = self.data_url.strip_prefix("data:")?.split(',').next()?;
        header.split(';').next().filter(|mime| !mime.is_empty())
    }

    /// The base64 payload after the comma.
    pub fn payload(&self) -> Option<&str> {
        self.data_url.split_once(',').map(|(_, payload)| payload)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_and_payload() {
        let image = EncodedImage::new("data:image/jpeg;base64,QUJD".to_string(), 4, 3);
        assert_eq!(image.mime_type(), Some("image/jpeg"));
        assert_eq!(image.payload(), Some("QUJD"));
        assert_eq!((image.width(), image.height()), (4, 3));
    }

    #[test]
    fn test_not_a_data_url() {
        let image = EncodedImage::new("QUJD".to_string(), 1, 1);
        assert_eq!(image.mime_type(), None);
        assert_eq!(image.payload(), None);
    }
}
