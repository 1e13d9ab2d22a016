//! Query-string options, e.g. `file.json?opt=hist&items=['a','b']`.

/// Percent escapes decoded inside option values.
const ESCAPES: [(&str, &str); 7] = [
    ("%27", "'"),
    ("%22", "\""),
    ("%20", " "),
    ("%3C", "<"),
    ("%3E", ">"),
    ("%5B", "["),
    ("%5D", "]"),
];

/// Value of option `name` in the query part of `url`.
///
/// `Some("")` when the option is present without a value, `None` when absent.
pub fn url_option(name: &str, url: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|part| {
        if part == name {
            return Some(String::new());
        }
        let value = part.strip_prefix(name)?.strip_prefix('=')?;
        Some(
            ESCAPES
                .iter()
                .fold(value.to_string(), |acc, (from, to)| acc.replace(from, to)),
        )
    })
}

/// Split `[a, 'b', "c"]` into its elements; a bare value becomes one element.
pub fn parse_as_array(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.is_empty() {
        return Vec::new();
    }
    let Some(inner) = value
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
    else {
        return vec![value.to_string()];
    };
    inner
        .split(',')
        .map(|item| unquote(item.trim()).to_string())
        .collect()
}

fn unquote(item: &str) -> &str {
    for quote in ['\'', '"'] {
        if item.len() > 1 && item.starts_with(quote) && item.ends_with(quote) {
            return &item[1..item.len() - 1];
        }
    }
    item
}

/// Elements of every `;`-separated option in `names`, concatenated.
pub fn url_option_as_array(names: &str, url: &str) -> Vec<String> {
    names
        .split(';')
        .filter_map(|name| url_option(name, url))
        .flat_map(|value| parse_as_array(&value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_option() {
        let url = "view.htm?file=hsimple.root&nobrowser&opt=col%20z";
        assert_eq!(url_option("file", url), Some("hsimple.root".to_string()));
        assert_eq!(url_option("nobrowser", url), Some(String::new()));
        assert_eq!(url_option("opt", url), Some("col z".to_string()));
        assert_eq!(url_option("item", url), None);
        assert_eq!(url_option("file", "no-query"), None);
    }

    #[test]
    fn test_option_prefix_is_not_a_match() {
        assert_eq!(url_option("opt", "x?options=1"), None);
    }

    #[test]
    fn test_parse_as_array() {
        assert_eq!(parse_as_array("  "), Vec::<String>::new());
        assert_eq!(parse_as_array("single"), vec!["single"]);
        assert_eq!(parse_as_array("['a', \"b\" , c]"), vec!["a", "b", "c"]);
        assert_eq!(parse_as_array("[']"), vec!["'"]);
    }

    #[test]
    fn test_url_option_as_array() {
        let url = "index.htm?item=[%27h1%27,%27h2%27]&items=h3";
        assert_eq!(url_option_as_array("item;items", url), vec!["h1", "h2", "h3"]);
    }
}
