use anyhow::Result;
use image::{io::Reader, DynamicImage, GenericImageView};
use std::io::Cursor;

/// Decode thumbnail bytes and convert them to ASCII art
pub fn bytes_to_ascii(bytes: &[u8], width: u32, height: u32) -> Result<Vec<String>> {
    let img = Reader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    Ok(image_to_ascii(&img, width, height))
}

/// Convert a DynamicImage to ASCII art
fn image_to_ascii(img: &DynamicImage, target_width: u32, target_height: u32) -> Vec<String> {
    // Aspect ratio is kept, so the result may be smaller than the target box
    let resized = img.resize(target_width, target_height, image::imageops::FilterType::Triangle);
    let grayscale = resized.grayscale();
    let (width, height) = grayscale.dimensions();

    // ASCII characters from darkest to lightest
    let char_array: Vec<char> = " .:-=+*#%@".chars().collect();

    (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    let intensity = grayscale.get_pixel(x, y)[0] as f32 / 255.0;
                    let index = (intensity * (char_array.len() - 1) as f32).round() as usize;
                    char_array[index]
                })
                .collect()
        })
        .collect()
}

/// Placeholder when no thumbnail is available
pub fn get_sad_face_ascii() -> Vec<String> {
    vec![
        "    ╭─────────╮".to_string(),
        "   ╱           ╲".to_string(),
        "  │   ◉     ◉   │".to_string(),
        "  │      ◡      │".to_string(),
        "  │    ╲___╱    │".to_string(),
        "   ╲           ╱".to_string(),
        "    ╲_________╱".to_string(),
        "".to_string(),
        "   No thumbnail".to_string(),
    ]
}

/// Placeholder while the thumbnail is downloading
pub fn get_loading_ascii() -> Vec<String> {
    vec![
        "    ╭─────────╮".to_string(),
        "   ╱           ╲".to_string(),
        "  │   Loading   │".to_string(),
        "  │      ...    │".to_string(),
        "   ╲           ╱".to_string(),
        "    ╲_________╱".to_string(),
    ]
}
