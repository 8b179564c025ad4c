//! Task name parsing (§4.1 "Naming shortcut").

/// Split a task name of form `<N>_<base>` into `(base, n)`. Ground truth
/// `mq/api.py`: only the leading underscore-delimited segment is tested for
/// numericness; everything else is the base name, unsplit.
pub fn parse_task_name(name: &str) -> (&str, Option<u32>) {
    match name.split_once('_') {
        Some((prefix, rest)) if !rest.is_empty() => match prefix.parse::<u32>() {
            Ok(n) => (rest, Some(n)),
            Err(_) => (name, None),
        },
        _ => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_prefix_is_extracted_as_worker_count() {
        assert_eq!(parse_task_name("6_gpt_email_consumer"), ("gpt_email_consumer", Some(6)));
    }

    #[test]
    fn non_numeric_prefix_leaves_name_untouched() {
        assert_eq!(parse_task_name("mailbox_read_producer"), ("mailbox_read_producer", None));
    }

    #[test]
    fn bare_name_with_no_underscore_has_no_prefix() {
        assert_eq!(parse_task_name("dispatcher"), ("dispatcher", None));
    }
}
