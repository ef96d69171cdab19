pub fn get_current_timestamp_str() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// File name unique to one detection call, so concurrent requests never
/// write over each other's artifacts.
pub fn invocation_file_name(prefix: &str, extension: &str) -> String {
    format!(
        "{}-{}-{}.{}",
        prefix,
        chrono::Local::now().format("%Y%m%d%H%M%S"),
        uuid::Uuid::new_v4().simple(),
        extension
    )
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_file_names_are_unique() {
        let a = invocation_file_name("overlay", "png");
        let b = invocation_file_name("overlay", "png");
        assert_ne!(a, b);
        assert!(a.starts_with("overlay-"));
        assert!(a.ends_with(".png"));
    }

    #[test]
    fn test_format_percentage_two_decimals() {
        assert_eq!(format_percentage(4.0), "4.00%");
        assert_eq!(format_percentage(12.3456), "12.35%");
    }
}
