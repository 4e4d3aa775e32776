use crate::{data_structures::texture::TextureAsset, resources::LoadError};

/// Decodes an image file, using the extension of `source` as a format hint.
pub fn decode(source: &str, bytes: &[u8]) -> Result<TextureAsset, LoadError> {
    let format = source
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.contains('/'));
    TextureAsset::from_bytes(bytes, source, format).map_err(|e| LoadError::Image {
        path: source.to_string(),
        message: format!("{:#}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecodable_bytes_are_an_image_error() {
        let err = decode("/textures/test.png", b"definitely not a png").unwrap_err();
        assert!(matches!(err, LoadError::Image { ref path, .. } if path == "/textures/test.png"));
    }
}
