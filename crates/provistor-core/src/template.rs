//! Init-script rendering.
//!
//! Templates are plain text with `{{name}}` placeholders; unknown
//! placeholders are left untouched.

use crate::node::Node;

pub const VPS_USER: &str = "{{vpsUser}}";
pub const VPS_PASSWORD: &str = "{{vpsPassword}}";
pub const APP_USER: &str = "{{appUser}}";
pub const APP_PASSWORD: &str = "{{appPassword}}";
pub const SSH_PUBLIC_KEY: &str = "{{sshPublicKey}}";

/// Fill every placeholder occurrence with the node's credentials.
pub fn render(template: &str, node: &Node, ssh_public_key: Option<&str>) -> String {
    let creds = &node.credentials;
    [
        (VPS_USER, creds.os_login.username.as_str()),
        (VPS_PASSWORD, creds.os_login.password.as_str()),
        (APP_USER, creds.app_login.username.as_str()),
        (APP_PASSWORD, creds.app_login.password.as_str()),
        (SSH_PUBLIC_KEY, ssh_public_key.unwrap_or_default()),
    ]
    .into_iter()
    .fold(template.to_string(), |script, (placeholder, value)| {
        script.replace(placeholder, value)
    })
}

/// Rendered script as provider user data; blank scripts are not sent.
pub fn user_data(template: &str, node: &Node, ssh_public_key: Option<&str>) -> Option<String> {
    let script = render(template, node, ssh_public_key);
    (!script.trim().is_empty()).then_some(script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_every_placeholder() {
        let node = Node::with_users("ops", "admin");
        let template = "user={{vpsUser}} pass={{vpsPassword}}\n\
                        again={{vpsPassword}}\n\
                        app={{appUser}}:{{appPassword}}\n\
                        key={{sshPublicKey}}";

        let script = render(template, &node, Some("ssh-ed25519 AAAA"));

        let os = &node.credentials.os_login.password;
        let app = &node.credentials.app_login.password;
        assert_eq!(
            script,
            format!("user=ops pass={os}\nagain={os}\napp=admin:{app}\nkey=ssh-ed25519 AAAA")
        );
    }

    #[test]
    fn missing_key_renders_empty() {
        let node = Node::new();
        assert_eq!(render("key=[{{sshPublicKey}}]", &node, None), "key=[]");
    }

    #[test]
    fn unknown_placeholders_survive() {
        let node = Node::new();
        assert_eq!(render("{{other}}", &node, None), "{{other}}");
    }

    #[test]
    fn blank_script_is_not_user_data() {
        let node = Node::new();
        assert!(user_data("  \n", &node, None).is_none());
        assert!(user_data("#cloud-config", &node, None).is_some());
    }
}
