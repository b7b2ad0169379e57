use do_api::{CreateDropletRequest, CreateSshKeyRequest, DigitalOceanClient, Error};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn droplet_request() -> CreateDropletRequest {
    CreateDropletRequest {
        name: "node-1".into(),
        region: "nyc1".into(),
        size: "512mb".into(),
        image: "ubuntu-16-04-x64".into(),
        user_data: Some("#cloud-config".into()),
        ssh_keys: vec![],
        backups: false,
        ipv6: false,
    }
}

#[tokio::test]
async fn create_droplet_sends_bearer_token_and_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/droplets"))
        .and(header("Authorization", "Bearer secret"))
        .and(body_partial_json(json!({"name": "node-1", "region": "nyc1", "size": "512mb"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "droplet": {"id": 42, "name": "node-1", "status": "new", "networks": {"v4": []}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DigitalOceanClient::with_base_url("secret", server.uri());
    let droplet = client.create_droplet(&droplet_request()).await.unwrap();

    assert_eq!(droplet.id, 42);
    assert_eq!(droplet.status, "new");
    assert!(droplet.networks.v4.is_empty());
}

#[tokio::test]
async fn get_droplet_parses_networks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/droplets/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "droplet": {
                "id": 42,
                "name": "node-1",
                "status": "active",
                "networks": {"v4": [{"ip_address": "203.0.113.7", "type": "public", "netmask": "255.255.240.0"}]}
            }
        })))
        .mount(&server)
        .await;

    let client = DigitalOceanClient::with_base_url("secret", server.uri());
    let droplet = client.get_droplet(42).await.unwrap();

    assert_eq!(droplet.status, "active");
    assert_eq!(droplet.networks.v4[0].ip_address, "203.0.113.7");
    assert_eq!(droplet.networks.v4[0].kind, "public");
}

#[tokio::test]
async fn unauthorized_keeps_status_and_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/droplets"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "id": "unauthorized",
            "message": "Unable to authenticate you."
        })))
        .mount(&server)
        .await;

    let client = DigitalOceanClient::with_base_url("bad", server.uri());
    let err = client.create_droplet(&droplet_request()).await.unwrap_err();

    assert!(matches!(err, Error::Api { endpoint: "create droplet", .. }));
    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    assert_eq!(err.message(), "Unable to authenticate you.");
}

#[tokio::test]
async fn non_json_error_body_is_reported_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/droplets/7"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = DigitalOceanClient::with_base_url("secret", server.uri());
    let err = client.get_droplet(7).await.unwrap_err();

    assert_eq!(err.message(), "upstream down");
}

#[tokio::test]
async fn missing_ssh_key_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/account/keys/aa:bb"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"id": "not_found", "message": "nope"})))
        .mount(&server)
        .await;

    let client = DigitalOceanClient::with_base_url("secret", server.uri());
    assert!(client.get_ssh_key("aa:bb").await.unwrap().is_none());
}

#[tokio::test]
async fn create_ssh_key_returns_registered_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/account/keys"))
        .and(body_partial_json(json!({"name": "provistor", "public_key": "ssh-rsa AAAA"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "ssh_key": {"id": 5, "fingerprint": "aa:bb", "name": "provistor", "public_key": "ssh-rsa AAAA"}
        })))
        .mount(&server)
        .await;

    let client = DigitalOceanClient::with_base_url("secret", server.uri());
    let key = client
        .create_ssh_key(&CreateSshKeyRequest {
            name: "provistor".into(),
            public_key: "ssh-rsa AAAA".into(),
        })
        .await
        .unwrap();

    assert_eq!(key.id, 5);
    assert_eq!(key.fingerprint, "aa:bb");
}
