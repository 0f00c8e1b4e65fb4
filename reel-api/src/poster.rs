/// Relative poster paths from the API resolve against this CDN base.
pub const IMAGES_BASE_URL: &str = "http://image.tmdb.org/t/p/";

/// Poster widths the image CDN serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosterSize {
    W92,
    W185,
    W500,
    W780,
}

impl PosterSize {
    pub fn token(self) -> &'static str {
        match self {
            PosterSize::W92 => "w92",
            PosterSize::W185 => "w185",
            PosterSize::W500 => "w500",
            PosterSize::W780 => "w780",
        }
    }
}

/// Build a full poster image URL from explicit parts: `<base><size><path>`.
pub fn poster_url(images_base: &str, size: PosterSize, poster_path: &str) -> String {
    format!("{}{}{}", images_base, size.token(), poster_path)
}
