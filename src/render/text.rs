//! Plain-text rendering of a read-only field tree, for printed views and the
//! command line.

use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use super::{ReadonlyFields, ReadonlyValue};

const INDENT: usize = 2;
const MIN_VALUE_WIDTH: usize = 8;

pub fn print_readonly(fields: &ReadonlyFields, width: usize) -> String {
    let mut lines = Vec::new();
    print_fields(fields, width.max(MIN_VALUE_WIDTH * 2), 0, &mut lines);
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn print_fields(fields: &ReadonlyFields, width: usize, indent: usize, lines: &mut Vec<String>) {
    let available = width.saturating_sub(indent);
    let label_width = fields
        .iter()
        .map(|(_, node)| UnicodeWidthStr::width(node.label.as_str()))
        .max()
        .unwrap_or(0)
        .min(available / 3);
    let value_width = available
        .saturating_sub(label_width + 2)
        .max(MIN_VALUE_WIDTH);
    let pad = " ".repeat(indent);

    for (_, node) in fields {
        let label = &node.label;
        if let ReadonlyValue::Group(groups) = &node.value {
            lines.push(format!("{pad}{label}"));
            for group in groups {
                lines.push(format!("{pad}{}{}", " ".repeat(INDENT), group.title));
                print_fields(&group.fields, width, indent + INDENT * 2, lines);
            }
            continue;
        }

        let text = value_text(&node.value);
        let mut wrapped: Vec<String> = text
            .lines()
            .flat_map(|line| {
                let pieces: Vec<String> = wrap(line, value_width)
                    .into_iter()
                    .map(|piece| piece.into_owned())
                    .collect();
                if pieces.is_empty() {
                    vec![String::new()]
                } else {
                    pieces
                }
            })
            .collect();
        if wrapped.is_empty() {
            wrapped.push(String::new());
        }

        let label_len = UnicodeWidthStr::width(label.as_str());
        let continuation = format!("{pad}{}", " ".repeat(label_width + 2));
        let mut values = wrapped.into_iter();
        if label_len > label_width {
            lines.push(format!("{pad}{label}"));
        } else {
            let first = values.next().unwrap_or_default();
            let spacing = " ".repeat(label_width - label_len + 2);
            lines.push(format!("{pad}{label}{spacing}{first}").trim_end().to_string());
        }
        for rest in values {
            lines.push(format!("{continuation}{rest}").trim_end().to_string());
        }
    }
}

fn value_text(value: &ReadonlyValue) -> String {
    match value {
        ReadonlyValue::Text(text) | ReadonlyValue::Date(text) | ReadonlyValue::Json(text) => {
            text.clone()
        }
        ReadonlyValue::Geo { displayed, .. } => displayed.clone(),
        ReadonlyValue::Badges(badges) => badges
            .iter()
            .map(|badge| badge.label.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        ReadonlyValue::Widget { output, .. } => output.clone(),
        ReadonlyValue::EntityLinks(links) => links
            .iter()
            .map(|link| match &link.href {
                Some(href) => format!("{} {} ({href})", link.entity_type, link.uuid),
                None => format!("{} {}", link.entity_type, link.uuid),
            })
            .collect::<Vec<_>>()
            .join(", "),
        ReadonlyValue::Missing { message } => format!("<{message}>"),
        ReadonlyValue::Group(_) | ReadonlyValue::Empty => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldsConfig;
    use crate::options::EngineOptions;
    use crate::registry::FieldRegistry;
    use crate::render::{HiddenSource, render_readonly};
    use serde_json::json;

    #[test]
    fn aligns_labels_and_wraps_values() {
        let fields = FieldsConfig::from_value(&json!({
            "name": {"type": "text", "label": "Name"},
            "notes": {"type": "text", "label": "Long notes"}
        }))
        .unwrap();
        let record = json!({"formCustomFields": {
            "name": "Ada",
            "notes": "one two three four five six seven eight"
        }});
        let tree = render_readonly(
            &fields,
            &record,
            &FieldRegistry::default(),
            &EngineOptions::default(),
            HiddenSource::Live,
        );
        let printed = print_readonly(&tree, 40);
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines[0], "Name        Ada");
        assert!(lines[1].starts_with("Long notes  one two"));
        assert!(lines.len() > 2);
        assert!(lines.iter().all(|line| line.len() <= 40));
    }
}
