/// Extract XML value with namespace-agnostic matching
pub fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    // Common ONVIF namespace prefixes first
    let prefixed_patterns = [
        format!("<tds:{}>", tag),
        format!("<tt:{}>", tag),
        format!("<trt:{}>", tag),
    ];

    for pattern in &prefixed_patterns {
        if let Some(value) = value_after(xml, pattern) {
            return Some(value);
        }
    }

    // Any other prefix
    let pattern = format!(":{}>", tag);
    if let Some(value) = value_after(xml, &pattern) {
        return Some(value);
    }

    // No prefix at all
    value_after(xml, &format!("<{}>", tag))
}

fn value_after(xml: &str, open_tag: &str) -> Option<String> {
    let start = xml.find(open_tag)?;
    let content_start = start + open_tag.len();
    let end = xml[content_start..].find("</")?;
    let value = xml[content_start..content_start + end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Extract XAddr from a capability section, e.g. `<tt:Media><tt:XAddr>…`
pub fn extract_capability_xaddr(xml: &str, capability: &str) -> Option<String> {
    let cap_patterns = [format!("<{}>", capability), format!(":{}>", capability)];

    for pattern in &cap_patterns {
        if let Some(cap_start) = xml.find(pattern.as_str()) {
            let cap_section = &xml[cap_start..];
            let end_pattern = format!(":{}>", capability);
            // Skip the opening tag itself when searching for the close
            let search_from = pattern.len();
            let end_idx = cap_section[search_from..]
                .find(end_pattern.as_str())
                .map(|i| i + search_from)
                .unwrap_or(cap_section.len());
            return extract_xml_value(&cap_section[..end_idx], "XAddr");
        }
    }
    None
}

/// Count `<Profiles …>` elements in a GetProfiles response
pub fn count_profiles(xml: &str) -> usize {
    let mut count = 0;
    let mut rest = xml;
    while let Some(idx) = rest.find('<') {
        rest = &rest[idx + 1..];
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        let local = name.rsplit(':').next().unwrap_or(name);
        if local == "Profiles" {
            count += 1;
        }
    }
    count
}

/// True when the body is a SOAP fault
pub fn is_soap_fault(xml: &str) -> bool {
    xml.contains(":Fault>") || xml.contains("<Fault>") || xml.contains("NotAuthorized")
}
