pub const VEHICLE_PHOTO: &str = include_str!("../data/prompts/vehicle_photo.txt");
pub const NEGATIVE: &str = include_str!("../data/prompts/negative.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}
