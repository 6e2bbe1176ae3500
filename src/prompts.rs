pub const VISION_DEFAULT: &str = include_str!("../data/prompts/vision.txt");
pub const VISION_BATCH: &str = include_str!("../data/prompts/vision_batch.txt");
pub const IMAGE_LABEL: &str = include_str!("../data/prompts/image_label.txt");
pub const THINKING_DEFAULT: &str = include_str!("../data/prompts/thinking.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// Vision prompt for a single image, prefixed with its 1-based position.
pub fn for_image(vision_prompt: &str, index: usize, total: usize) -> String {
    let label = render(
        IMAGE_LABEL.trim(),
        &[("index", &index.to_string()), ("total", &total.to_string())],
    );
    format!("{}\n{}", label, vision_prompt)
}

/// Vision prompt for one call carrying `count` images.
pub fn for_batch(vision_prompt: &str, count: usize) -> String {
    let instruction = render(VISION_BATCH.trim(), &[("count", &count.to_string())]);
    format!("{}\n\n{}", vision_prompt, instruction)
}

/// Heading for one image's description in the combined vision summary.
pub fn image_block(index: usize, text: &str) -> String {
    format!("Image {}:\n{}", index, text)
}
