use axum::body::Bytes;
use axum::extract::Multipart;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::db::models::{Category, Location, NewPost, Post};
use crate::error::AppResult;
use crate::forms::{max_chars, optional_id, required, FormErrors, SelectOption, INVALID_CHOICE};

/// Formats accepted for the publish date, tried in order.
pub const PUB_DATE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// What a `datetime-local` input expects.
pub const PUB_DATE_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub const TITLE_MAX_CHARS: usize = 256;

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Read a publish date typed in local time `tz` and normalise it to UTC.
pub fn parse_pub_date(raw: &str, tz: FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    PUB_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).single())
        .map(|local| local.with_timezone(&Utc))
}

pub fn format_pub_date_input(dt: &DateTime<Utc>, tz: FixedOffset) -> String {
    dt.with_timezone(&tz).format(PUB_DATE_INPUT_FORMAT).to_string()
}

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub data: Bytes,
}

impl UploadedImage {
    /// Lowercased extension if the name and the leading bytes agree on an image type.
    pub fn image_extension(&self) -> Option<String> {
        let mime = mime_guess::from_path(&self.file_name).first()?;
        if mime.type_() != mime_guess::mime::IMAGE {
            return None;
        }
        let data = self.data.as_ref();
        let magic_ok = match mime.subtype().as_str() {
            "jpeg" => data.starts_with(&[0xFF, 0xD8, 0xFF]),
            "png" => data.starts_with(b"\x89PNG\r\n\x1a\n"),
            "gif" => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
            "webp" => data.len() >= 12 && &data[..4] == b"RIFF" && &data[8..12] == b"WEBP",
            _ => false,
        };
        if !magic_ok {
            return None;
        }
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// What to do with the stored image on save.
#[derive(Debug, Clone)]
pub enum ImageChange {
    Keep,
    Clear,
    Replace(UploadedImage),
}

/// Choices offered to the author when the form is built.
#[derive(Debug, Clone, Default)]
pub struct PostChoices {
    pub categories: Vec<Category>,
    /// Published locations only.
    pub locations: Vec<Location>,
    /// Location already stored on the post being edited, kept valid even if unpublished.
    pub current_location: Option<i64>,
}

impl PostChoices {
    fn location_allowed(&self, id: i64) -> bool {
        self.current_location == Some(id) || self.locations.iter().any(|l| l.id == id)
    }
}

/// Cleaned post fields; the image still has to be stored.
#[derive(Debug, Clone)]
pub struct CleanPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub image: ImageChange,
}

impl CleanPost {
    pub fn into_new_post(self, image: Option<String>) -> NewPost {
        NewPost {
            title: self.title,
            text: self.text,
            pub_date: self.pub_date,
            category_id: Some(self.category_id),
            location_id: self.location_id,
            image,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub image: Option<UploadedImage>,
    pub clear_image: bool,
    pub errors: FormErrors,
}

impl PostForm {
    /// Bind a `multipart/form-data` submission. Unknown fields are ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = PostForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_owned).unwrap_or_default();
            match name.as_str() {
                "title" => form.title = field.text().await?,
                "text" => form.text = field.text().await?,
                "pub_date" => form.pub_date = field.text().await?,
                "category" => form.category = field.text().await?,
                "location" => form.location = field.text().await?,
                "image-clear" => {
                    form.clear_image = !field.text().await?.is_empty();
                }
                "image" => {
                    let file_name = field.file_name().map(str::to_owned).unwrap_or_default();
                    let data = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen
                    if !file_name.is_empty() {
                        form.image = Some(UploadedImage { file_name, data });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    /// Initial values for editing an existing post.
    pub fn from_post(post: &Post, tz: FixedOffset) -> Self {
        PostForm {
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: format_pub_date_input(&post.pub_date, tz),
            category: post
                .category
                .as_ref()
                .map(|c| c.id.to_string())
                .unwrap_or_default(),
            location: post
                .location
                .as_ref()
                .map(|l| l.id.to_string())
                .unwrap_or_default(),
            ..PostForm::default()
        }
    }

    /// Validate against `choices`; on failure the errors are kept on the form.
    pub fn validate(&mut self, choices: &PostChoices, tz: FixedOffset) -> Option<CleanPost> {
        let mut errors = FormErrors::default();

        let title = required(&mut errors, "title", &self.title)
            .filter(|t| max_chars(&mut errors, "title", t, TITLE_MAX_CHARS));
        let text = required(&mut errors, "text", &self.text);

        let pub_date = required(&mut errors, "pub_date", &self.pub_date).and_then(|raw| {
            let parsed = parse_pub_date(&raw, tz);
            if parsed.is_none() {
                errors.add("pub_date", "Enter a valid date/time.");
            }
            parsed
        });

        let category_id = required(&mut errors, "category", &self.category).and_then(|raw| {
            match raw.parse::<i64>() {
                Ok(id) if choices.categories.iter().any(|c| c.id == id) => Some(id),
                _ => {
                    errors.add("category", INVALID_CHOICE);
                    None
                }
            }
        });

        let location_id = match optional_id(&mut errors, "location", &self.location) {
            Some(Some(id)) if !choices.location_allowed(id) => {
                errors.add("location", INVALID_CHOICE);
                None
            }
            other => other,
        };

        let image = match (&self.image, self.clear_image) {
            (Some(_), true) => {
                errors.add(
                    "image",
                    "Please either submit a file or check the clear checkbox, not both.",
                );
                None
            }
            (Some(upload), false) if upload.data.is_empty() => {
                errors.add("image", "The submitted file is empty.");
                None
            }
            (Some(upload), false) if upload.image_extension().is_none() => {
                errors.add("image", INVALID_IMAGE);
                None
            }
            (Some(upload), false) => Some(ImageChange::Replace(upload.clone())),
            (None, true) => Some(ImageChange::Clear),
            (None, false) => Some(ImageChange::Keep),
        };

        if !errors.is_empty() {
            self.errors = errors;
            return None;
        }

        Some(CleanPost {
            title: title?,
            text: text?,
            pub_date: pub_date?,
            category_id: category_id?,
            location_id: location_id?,
            image: image?,
        })
    }

    pub fn category_options(&self, choices: &PostChoices) -> Vec<SelectOption> {
        std::iter::once(SelectOption::new("", "---------", &self.category))
            .chain(
                choices
                    .categories
                    .iter()
                    .map(|c| SelectOption::new(c.id, c.title.clone(), &self.category)),
            )
            .collect()
    }

    /// Published locations only, even when the post already points elsewhere.
    pub fn location_options(&self, choices: &PostChoices) -> Vec<SelectOption> {
        std::iter::once(SelectOption::new("", "Choose a location", &self.location))
            .chain(
                choices
                    .locations
                    .iter()
                    .map(|l| SelectOption::new(l.id, l.name.clone(), &self.location)),
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Timelike};

    fn moscow() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).unwrap()
    }

    fn category(id: i64, published: bool) -> Category {
        Category {
            id,
            title: format!("cat {}", id),
            description: String::new(),
            slug: format!("cat-{}", id),
            is_published: published,
            created_at: String::new(),
        }
    }

    fn location(id: i64) -> Location {
        Location {
            id,
            name: format!("loc {}", id),
            is_published: true,
            created_at: String::new(),
        }
    }

    fn choices() -> PostChoices {
        PostChoices {
            categories: vec![category(1, true), category(2, false)],
            locations: vec![location(10)],
            current_location: None,
        }
    }

    fn filled() -> PostForm {
        PostForm {
            title: "Title".into(),
            text: "Body".into(),
            pub_date: "2024-05-01T12:30".into(),
            category: "1".into(),
            ..PostForm::default()
        }
    }

    #[test]
    fn pub_date_accepts_all_formats_in_local_time() {
        let tz = moscow();
        let a = parse_pub_date("2024-05-01T12:30", tz).unwrap();
        let b = parse_pub_date("2024-05-01 12:30:00", tz).unwrap();
        let c = parse_pub_date(" 2024-05-01 12:30 ", tz).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.hour(), 9);
        assert!(parse_pub_date("01.05.2024", tz).is_none());
    }

    #[test]
    fn pub_date_input_is_local() {
        let dt = parse_pub_date("2024-05-01T12:30", moscow()).unwrap();
        assert_eq!(format_pub_date_input(&dt, moscow()), "2024-05-01T12:30");
        assert_eq!(
            format_pub_date_input(&dt, FixedOffset::east_opt(0).unwrap()),
            "2024-05-01T09:30"
        );
    }

    #[test]
    fn valid_form_cleans() {
        let mut form = filled();
        form.location = "10".into();
        let clean = form.validate(&choices(), moscow()).unwrap();
        assert_eq!(clean.title, "Title");
        assert_eq!(clean.category_id, 1);
        assert_eq!(clean.location_id, Some(10));
        assert!(matches!(clean.image, ImageChange::Keep));
        assert!(form.errors.is_empty());
    }

    #[test]
    fn unpublished_category_is_still_a_choice() {
        let mut form = filled();
        form.category = "2".into();
        assert!(form.validate(&choices(), moscow()).is_some());
    }

    #[test]
    fn missing_fields_are_reported() {
        let mut form = PostForm::default();
        assert!(form.validate(&choices(), moscow()).is_none());
        for field in ["title", "text", "pub_date", "category"] {
            assert!(form.errors.has(field), "no error for {}", field);
        }
        assert!(!form.errors.has("location"));
    }

    #[test]
    fn bad_values_are_reported() {
        let mut form = filled();
        form.title = "x".repeat(TITLE_MAX_CHARS + 1);
        form.pub_date = "tomorrow".into();
        form.category = "99".into();
        form.location = "11".into();
        assert!(form.validate(&choices(), moscow()).is_none());
        for field in ["title", "pub_date", "category", "location"] {
            assert!(form.errors.has(field), "no error for {}", field);
        }
    }

    #[test]
    fn current_unpublished_location_stays_valid() {
        let mut choices = choices();
        let mut form = filled();
        form.location = "11".into();
        assert!(form.validate(&choices, moscow()).is_none());

        choices.current_location = Some(11);
        let mut form = filled();
        form.location = "11".into();
        assert_eq!(
            form.validate(&choices, moscow()).unwrap().location_id,
            Some(11)
        );
        // The selectable list still shows published locations only.
        let values: Vec<String> = form
            .location_options(&choices)
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec!["", "10"]);
    }

    #[test]
    fn image_must_look_like_an_image() {
        let png = UploadedImage {
            file_name: "Photo.PNG".into(),
            data: Bytes::from_static(b"\x89PNG\r\n\x1a\n rest"),
        };
        assert_eq!(png.image_extension().as_deref(), Some("png"));

        let fake = UploadedImage {
            file_name: "photo.jpg".into(),
            data: Bytes::from_static(b"<html>"),
        };
        assert!(fake.image_extension().is_none());

        let mut form = filled();
        form.image = Some(fake);
        assert!(form.validate(&choices(), moscow()).is_none());
        assert!(form.errors.has("image"));

        let mut form = filled();
        form.image = Some(png);
        form.clear_image = true;
        assert!(form.validate(&choices(), moscow()).is_none());
    }

    #[test]
    fn clear_checkbox_clears() {
        let mut form = filled();
        form.clear_image = true;
        let clean = form.validate(&choices(), moscow()).unwrap();
        assert!(matches!(clean.image, ImageChange::Clear));
    }

    #[test]
    fn edit_form_prefills_from_post() {
        let tz = moscow();
        let post = Post {
            id: 1,
            title: "T".into(),
            text: "X".into(),
            pub_date: Utc::now() - Duration::days(1),
            image: None,
            is_published: true,
            created_at: Utc::now(),
            author_id: 1,
            author_username: "a".into(),
            category: None,
            location: None,
            comment_count: 0,
        };
        let form = PostForm::from_post(&post, tz);
        assert_eq!(form.title, "T");
        assert_eq!(form.category, "");
        assert_eq!(form.pub_date, format_pub_date_input(&post.pub_date, tz));
        assert!(form.category_options(&choices())[0].selected);
    }
}
