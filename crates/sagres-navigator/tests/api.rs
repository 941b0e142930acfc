//! JSON API: linked-entity caching, message pagination and enrichment.

mod common;

use common::{navigator, INSTITUTION_ID};
use sagres_navigator::model::{ClassRef, DisciplineSummary, Person};
use sagres_navigator::{SagresError, Status};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_json(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_linked_entity_is_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/pessoas/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "nome": "Maria da Silva",
            "email": "maria@example.org"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let navigator = navigator(&server);
    let session = navigator.session();
    assert!(session.retrieve::<Person>(7).is_none());

    let first: Person = session.retrieve_from_link("pessoas/7").await.unwrap();
    let second: Person = session.retrieve_from_link("pessoas/7").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.link.as_deref(), Some("pessoas/7"));

    let cached = session.retrieve::<Person>(7).unwrap();
    assert_eq!(cached.name, "Maria da Silva");
}

#[tokio::test]
async fn test_missing_linked_entity_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/disciplinas/1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let navigator = navigator(&server);
    for _ in 0..2 {
        let error = navigator
            .session()
            .retrieve_from_link::<DisciplineSummary>("disciplinas/1")
            .await
            .unwrap_err();
        assert!(matches!(error, SagresError::Status { status: 404, .. }));
    }
    assert!(navigator.session().retrieve::<DisciplineSummary>(1).is_none());
}

#[tokio::test]
async fn test_me() {
    let server = MockServer::start().await;
    mount_json(&server, "/Api/eu", json!({"id": 7, "nome": "Maria da Silva"})).await;

    let navigator = navigator(&server);
    let result = navigator.me().await;

    assert_eq!(result.status(), Status::Success);
    assert_eq!(result.payload().unwrap().id, 7);
    assert!(navigator.session().retrieve::<Person>(7).is_some());
}

#[tokio::test]
async fn test_me_after_logout_sees_new_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/eu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "nome": "Usuario A"})))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Api/eu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 2, "nome": "Usuario B"})))
        .expect(1)
        .mount(&server)
        .await;

    let navigator = navigator(&server);
    let first = navigator.me().await;
    assert_eq!(first.payload().unwrap().id, 1);

    navigator.logout();
    assert!(navigator.session().retrieve::<Person>(1).is_none());

    let second = navigator.me().await;
    assert_eq!(second.status(), Status::Success);
    let person = second.payload().unwrap();
    assert_eq!(person.id, 2);
    assert_eq!(person.name, "Usuario B");
}

#[tokio::test]
async fn test_messages_walk_older_pages_and_enrich() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/diario/recados"))
        .and(query_param("idPessoa", "7"))
        .and(query_param("pagina", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "itens": [{
                "id": 1,
                "dataHora": "2019-03-01T08:00:00",
                "remetente": {"href": "pessoas/404"},
                "perfilRemetente": 3,
                "descricao": "Calendário acadêmico publicado"
            }]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Api/diario/recados"))
        .and(query_param("idPessoa", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "maisAntigos": {"href": "diario/recados?idPessoa=7&pagina=2"},
            "itens": [{
                "id": 2,
                "dataHora": "2019-03-02T10:00:00-03:00",
                "remetente": {"href": "pessoas/9"},
                "perfilRemetente": 2,
                "descricao": "Prova adiada",
                "escopos": {"href": "recados/2/escopos"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Api/pessoas/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_json(&server, "/Api/pessoas/9", json!({"id": 9, "nome": "José dos Santos"})).await;
    mount_json(
        &server,
        "/Api/recados/2/escopos",
        json!({"itens": [{"id": 30, "tipo": 1, "turma": {"href": "turmas/40"}}]}),
    )
    .await;
    mount_json(
        &server,
        "/Api/turmas/40",
        json!({"id": 40, "descricao": "T01", "disciplina": {"href": "disciplinas/50"}}),
    )
    .await;
    mount_json(
        &server,
        "/Api/disciplinas/50",
        json!({"id": 50, "codigo": "EXA801", "nome": "Cálculo Diferencial I", "ementa": "Limites e derivadas"}),
    )
    .await;

    let navigator = navigator(&server);
    let result = navigator.messages(7, true).await;

    assert_eq!(result.status(), Status::Success);
    let messages = result.payload().unwrap();
    let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let institutional = &messages[0];
    assert_eq!(institutional.sender_name, Some(format!(".{INSTITUTION_ID}.")));
    assert!(institutional.discipline.is_none());

    let from_teacher = &messages[1];
    assert_eq!(from_teacher.sender_name.as_deref(), Some("José dos Santos"));
    assert_eq!(from_teacher.discipline.as_deref(), Some("Cálculo Diferencial I"));
    assert_eq!(from_teacher.discipline_code.as_deref(), Some("EXA801"));
    assert_eq!(from_teacher.objective.as_deref(), Some("Limites e derivadas"));

    let class = navigator.session().retrieve::<ClassRef>(40).unwrap();
    assert_eq!(class.description.as_deref(), Some("T01"));
}

#[tokio::test]
async fn test_messages_first_page_only() {
    let server = MockServer::start().await;
    mount_json(
        &server,
        "/Api/diario/recados",
        json!({
            "maisAntigos": {"href": "diario/recados?idPessoa=7&pagina=2"},
            "itens": [{"id": 2, "descricao": "Sem remetente"}]
        }),
    )
    .await;

    let result = navigator(&server).messages(7, false).await;

    assert_eq!(result.status(), Status::Success);
    assert_eq!(result.payload().unwrap().len(), 1);
}

#[tokio::test]
async fn test_messages_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/Api/diario/recados"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = navigator(&server).messages(7, true).await;

    assert_eq!(result.status(), Status::ResponseFailed);
    assert_eq!(result.code(), Some(401));
}
