//! Turn human readable labels into JSON member names

/// Convert a label into a snake_case name.
///
/// ASCII letters are lower-cased, every run of non-alphanumeric
/// characters becomes a single underscore, and leading or trailing
/// underscores are dropped.
pub fn name_to_snake(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev_non_alnum = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            result.push(c.to_ascii_lowercase());
            prev_non_alnum = false;
        } else {
            if !result.is_empty() && !prev_non_alnum {
                result.push('_');
            }
            prev_non_alnum = true;
        }
    }

    if result.ends_with('_') {
        result.pop();
    }

    result
}

/// Like [`name_to_snake`], but parenthesized parts (usually units or
/// abbreviations, like "(mW)") are removed first.
pub fn name_to_snake_unparen(name: &str) -> String {
    let mut stripped = String::with_capacity(name.len());
    let mut depth = 0usize;

    for c in name.chars() {
        match c {
            '(' => depth += 1,
            ')' if depth > 0 => depth -= 1,
            c if depth == 0 => stripped.push(c),
            _ => {}
        }
    }

    name_to_snake(&stripped)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snake_case_basics() {
        assert_eq!(name_to_snake("_Snake __ case_"), "snake_case");
        assert_eq!(name_to_snake("Output  power (mW)!"), "output_power_mw");
        assert_eq!(name_to_snake("Peripheral device type"), "peripheral_device_type");
        assert_eq!(name_to_snake("T10 vendor id"), "t10_vendor_id");
        assert_eq!(name_to_snake(""), "");
        assert_eq!(name_to_snake("--"), "");
    }

    #[test]
    fn snake_case_without_parentheses() {
        assert_eq!(name_to_snake_unparen("Output  power (mW)!"), "output_power");
        assert_eq!(name_to_snake_unparen("Temperature (C) limit"), "temperature_limit");
        assert_eq!(name_to_snake_unparen("nested ((a) b) end"), "nested_end");
        assert_eq!(name_to_snake_unparen("_Snake __ case_"), "snake_case");
    }
}
