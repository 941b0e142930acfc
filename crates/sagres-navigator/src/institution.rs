//! Tenant registry: which Sagres deployment a session talks to.
//!
//! Each institution carries its base URL and the login tokens that the
//! portal's login form expects on a cold start. Endpoint paths are shared by
//! every deployment and are resolved against the selected base URL.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SagresError, SagresResult};

// ── Public types ────────────────────────────────────────────────────────────

/// Captcha challenge shown on a deployment's login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaSettings {
    pub site_key: String,
    /// Page the challenge widget is rendered for.
    pub base_url: String,
}

/// A supported Sagres deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    /// Short identifier such as `"UEFS"`. Lookups are case-insensitive.
    pub id: String,
    /// Portal root, e.g. `http://academico2.uefs.br/Portal`.
    pub base_url: String,
    /// Root of the JSON API used for messages and linked entities.
    #[serde(default)]
    pub api_url: Option<String>,
    /// `__VIEWSTATE` value for the cold-start login form.
    pub view_state: String,
    /// `__VIEWSTATEGENERATOR` value for the cold-start login form.
    pub view_state_generator: String,
    /// `__EVENTVALIDATION` value for the cold-start login form.
    pub event_validation: String,
    /// Present when the login form requires a captcha response.
    #[serde(default)]
    pub captcha: Option<CaptchaSettings>,
}

/// Named portal pages. Paths are identical across deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Messages,
    Grades,
    GradesAny,
    Diary,
    ClassPage,
    EnrollmentCertificate,
    Flowchart,
    History,
    DemandOffers,
    RequestedServices,
    AllDisciplines,
}

impl Endpoint {
    /// Path relative to the institution base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Login => "/Acesso.aspx",
            Endpoint::Messages => "/Modules/Diario/Aluno/Consultas/Recados.aspx",
            Endpoint::Grades => "/Modules/Diario/Aluno/Relatorio/Boletim.aspx",
            Endpoint::GradesAny => "/Modules/Diario/Aluno/Relatorio/Boletim.aspx?op=notas",
            Endpoint::Diary => "/Modules/Diario/Aluno/Default.aspx",
            Endpoint::ClassPage => "/Modules/Diario/Aluno/Classe/ConsultaAulas.aspx",
            Endpoint::EnrollmentCertificate => {
                "/Modules/Diario/Aluno/Relatorio/ComprovanteMatricula.aspx"
            }
            Endpoint::Flowchart => "/Modules/Diario/Aluno/Relatorio/FluxogramaAluno.aspx",
            Endpoint::History => "/Modules/Diario/Aluno/Relatorio/HistoricoEscolar.aspx",
            Endpoint::DemandOffers => "/Modules/Diario/Aluno/Matricula/Demanda.aspx",
            Endpoint::RequestedServices => {
                "/Modules/Diario/Aluno/Academico/SolicitacaoServico.aspx"
            }
            Endpoint::AllDisciplines => "/Modules/Diario/Aluno/Classe/SelecaoClasse.aspx",
        }
    }
}

impl Institution {
    /// Absolute URL of `endpoint` for this deployment.
    pub fn url(&self, endpoint: Endpoint) -> String {
        let base = self.base_url.trim_end_matches('/');
        match endpoint {
            Endpoint::AllDisciplines => format!(
                "{base}{}?redirect={base}{}",
                endpoint.path(),
                Endpoint::ClassPage.path()
            ),
            _ => format!("{base}{}", endpoint.path()),
        }
    }

    /// Root of the JSON API. Defaults to `<origin>/Api/SagresApi`.
    pub fn api_root(&self) -> SagresResult<String> {
        if let Some(api) = &self.api_url {
            return Ok(api.trim_end_matches('/').to_string());
        }
        let base = Url::parse(&self.base_url)?;
        let origin = base.origin().ascii_serialization();
        Ok(format!("{origin}/Api/SagresApi"))
    }

    /// Resolve an API link. Absolute links are returned untouched.
    pub fn api_link(&self, href: &str) -> SagresResult<String> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Ok(href.to_string());
        }
        let root = self.api_root()?;
        Ok(format!("{root}/{}", href.trim_start_matches('/')))
    }
}

// ── Built-in deployments ────────────────────────────────────────────────────

const UEFS_VIEW_STATE: &str = "/wEPDwULLTE1ODU0NDkxODMPZBYCZg9kFgQCAQ9kFgwCBA8WAh4EaHJlZgU9fi9BcHBfVGhlbWVzL05ld1RoZW1lL0FjZXNzb0V4dGVybm8uY3NzP2ZwPTYzNzAyNzc1MTk0MDAwMDAwMGQCBQ8WAh8ABTh+L0FwcF9UaGVtZXMvTmV3VGhlbWUvQ29udGV1ZG8uY3NzP2ZwPTYzNzAyNzc1MTk0MDAwMDAwMGQCBg8WAh8ABTl+L0FwcF9UaGVtZXMvTmV3VGhlbWUvRXN0cnV0dXJhLmNzcz9mcD02MzcwMjc3NTE5NDAwMDAwMDBkAgcPFgIfAAU5fi9BcHBfVGhlbWVzL05ld1RoZW1lL01lbnNhZ2Vucy5jc3M/ZnA9NjM3MDI3NzUxOTAwMDAwMDAwZAIIDxYCHwAFNn4vQXBwX1RoZW1lcy9OZXdUaGVtZS9Qb3BVcHMuY3NzP2ZwPTYzNzAyNzc1MTkwMDAwMDAwMGQCCQ8WAh8ABVgvUG9ydGFsL1Jlc291cmNlcy9TdHlsZXMvQXBwX1RoZW1lcy9OZXdUaGVtZS9OZXdUaGVtZTAxL2VzdGlsby5jc3M/ZnA9NjM2MTA1ODI2NjQwMDAwMDAwZAIDD2QWBAIHDw8WBB4EVGV4dAUNU2FncmVzIFBvcnRhbB4HVmlzaWJsZWhkZAILD2QWBgIBDw8WAh8CaGRkAgMPPCsACgEADxYCHg1SZW1lbWJlck1lU2V0aGQWAmYPZBYCAg8PZBYCZg8PFgIfAmhkZAIFD2QWBGYPFgIfAmdkAgIPZBYCAgEPFgIeC18hSXRlbUNvdW50AgEWAmYPZBYCAgEPFgIeBXN0eWxlBQ5tYXgtd2lkdGg6NGNtOxYGAgEPDxYCHwEFDVNhZ3JlcyBNb2JpbGVkZAIDDw8WBB4ISW1hZ2VVcmwFLH4vUmVzb3VyY2VzL0ltYWdlcy9RUkNvZGVzL1NhZ3JlcyBNb2JpbGUuZ2lmHgdUb29sVGlwBSdodHRwOi8vYWNhZGVtaWNvMi51ZWZzLmJyL0FwaS9TYWdyZXNBcGkWAh8FBRVoZWlnaHQ6NGNtO3dpZHRoOjRjbTtkAgUPDxYCHwEFJ2h0dHA6Ly9hY2FkZW1pY28yLnVlZnMuYnIvQXBpL1NhZ3Jlc0FwaWRkZItb8cQDTqGo3ElRduZ1XApYVmCh";
const UEFS_EVENT_VALIDATION: &str = "/wEdAATnIiNnjIHfuynpJ6c+hpLFM4nqN81slLG8uEFL8sVLUjoauXZ8QTl2nEJmPx53FYhjUq3W1Gjeb7bKHHg4dlobaD+y5832SGxeRXzynK45uK0ey+U=";

const UESC_VIEW_STATE: &str = "/wEPDwUKMTc5MDkxMTc2NA9kFgJmD2QWBAIBD2QWDAIEDxYCHgRocmVmBT1+L0FwcF9UaGVtZXMvTmV3VGhlbWUvQWNlc3NvRXh0ZXJuby5jc3M/ZnA9NjM2NjM3MzU3OTgwMDAwMDAwZAIFDxYCHwAFOH4vQXBwX1RoZW1lcy9OZXdUaGVtZS9Db250ZXVkby5jc3M/ZnA9NjM2NjM3MzU3OTgwMDAwMDAwZAIGDxYCHwAFOX4vQXBwX1RoZW1lcy9OZXdUaGVtZS9Fc3RydXR1cmEuY3NzP2ZwPTYzNjYzNzM1Nzk4MDAwMDAwMGQCBw8WAh8ABTl+L0FwcF9UaGVtZXMvTmV3VGhlbWUvTWVuc2FnZW5zLmNzcz9mcD02MzY2MzczNTc5ODAwMDAwMDBkAggPFgIfAAU2fi9BcHBfVGhlbWVzL05ld1RoZW1lL1BvcFVwcy5jc3M/ZnA9NjM2NjM3MzU3OTgwMDAwMDAwZAIJDxYCHwAFXi9Qb3J0YWxTYWdyZXMvUmVzb3VyY2VzL1N0eWxlcy9BcHBfVGhlbWVzL05ld1RoZW1lL05ld1RoZW1lMDEvZXN0aWxvLmNzcz9mcD02MzU5ODc0MDQ1MDAwMDAwMDBkAgMPZBYEAgcPDxYEHgRUZXh0BQ1TYWdyZXMgUG9ydGFsHgdWaXNpYmxlaGRkAgsPZBYGAgEPDxYCHwJoZGQCAw88KwAKAQAPFgIeDVJlbWVtYmVyTWVTZXRoZGQCBQ9kFgICAg9kFgICAQ8WAh4LXyFJdGVtQ291bnRmZGQinLLjRIyhdDAeQdsQFI4yEn7UBw==";
const UESC_EVENT_VALIDATION: &str = "/wEdAATEfAKci9KTCh4ou3w/C6rnM4nqN81slLG8uEFL8sVLUjoauXZ8QTl2nEJmPx53FYhjUq3W1Gjeb7bKHHg4dlobhmIrQ+4CIRu5sTfSTNFJmT7g9ok=";

const UNEB_VIEW_STATE: &str = "/wEPDwUKMTU3NjQ5NTUyNw9kFgJmD2QWBAIBD2QWDAIEDxYCHgRocmVmBT1+L0FwcF9UaGVtZXMvTmV3VGhlbWUvQWNlc3NvRXh0ZXJuby5jc3M/ZnA9NjM2ODQzNTM2OTgwMDAwMDAwZAIFDxYCHwAFOH4vQXBwX1RoZW1lcy9OZXdUaGVtZS9Db250ZXVkby5jc3M/ZnA9NjM2ODQzNTM2OTgwMDAwMDAwZAIGDxYCHwAFOX4vQXBwX1RoZW1lcy9OZXdUaGVtZS9Fc3RydXR1cmEuY3NzP2ZwPTYzNjg0MzUzNjk4MDAwMDAwMGQCBw8WAh8ABTl+L0FwcF9UaGVtZXMvTmV3VGhlbWUvTWVuc2FnZW5zLmNzcz9mcD02MzY4NDM1MzcwMDAwMDAwMDBkAggPFgIfAAU2fi9BcHBfVGhlbWVzL05ld1RoZW1lL1BvcFVwcy5jc3M/ZnA9NjM2ODQzNTM3MDAwMDAwMDAwZAIJDxYCHwAFXi9Qb3J0YWxTYWdyZXMvUmVzb3VyY2VzL1N0eWxlcy9BcHBfVGhlbWVzL05ld1RoZW1lL05ld1RoZW1lMDEvZXN0aWxvLmNzcz9mcD02MzYxMDU4MjY2NDAwMDAwMDBkAgMPZBYEAgcPDxYEHgRUZXh0BQ1TYWdyZXMgUG9ydGFsHgdWaXNpYmxlaGRkAgsPZBYGAgEPDxYCHwJoZGQCAw88KwAKAQAPFgIeDVJlbWVtYmVyTWVTZXRoZGQCBQ9kFgRmDxYCHwJnZAICD2QWAgIBDxYCHgtfIUl0ZW1Db3VudAIBFgJmD2QWAgIBDxYCHgVzdHlsZQUObWF4LXdpZHRoOjRjbTsWBgIBDw8WAh8BBQ1TYWdyZXMgTW9iaWxlZGQCAw8PFgQeCEltYWdlVXJsBSx+L1Jlc291cmNlcy9JbWFnZXMvUVJDb2Rlcy9TYWdyZXMgTW9iaWxlLmdpZh4HVG9vbFRpcAUpaHR0cDovL3d3dy5wb3J0YWxhY2FkZW1pY28udW5lYi5ici9tb2JpbGUWAh8FBRVoZWlnaHQ6NGNtO3dpZHRoOjRjbTtkAgUPDxYCHwEFKWh0dHA6Ly93d3cucG9ydGFsYWNhZGVtaWNvLnVuZWIuYnIvbW9iaWxlZGRk6KbwVNQIRRanfYZS7fyfM5bX7WM=";
const UNEB_EVENT_VALIDATION: &str = "/wEdAAQcFb3kXjnQ0ak1f3DTxtR0M4nqN81slLG8uEFL8sVLUjoauXZ8QTl2nEJmPx53FYhjUq3W1Gjeb7bKHHg4dlob2AnNAnxUHibEnTy5EZoeXTlpFwQ=";

const UESB_VIEW_STATE: &str = "/wEPDwUKMTc5MDkxMTc2NA9kFgJmD2QWBAIBD2QWDAIEDxYCHgRocmVmBT1+L0FwcF9UaGVtZXMvTmV3VGhlbWUvQWNlc3NvRXh0ZXJuby5jc3M/ZnA9NjM2ODQzNTM2OTgwMDAwMDAwZAIFDxYCHwAFOH4vQXBwX1RoZW1lcy9OZXdUaGVtZS9Db250ZXVkby5jc3M/ZnA9NjM2ODQzNTM2OTgwMDAwMDAwZAIGDxYCHwAFOX4vQXBwX1RoZW1lcy9OZXdUaGVtZS9Fc3RydXR1cmEuY3NzP2ZwPTYzNjg0MzUzNjk4MDAwMDAwMGQCBw8WAh8ABTl+L0FwcF9UaGVtZXMvTmV3VGhlbWUvTWVuc2FnZW5zLmNzcz9mcD02MzY4NDM1MzcwMDAwMDAwMDBkAggPFgIfAAU2fi9BcHBfVGhlbWVzL05ld1RoZW1lL1BvcFVwcy5jc3M/ZnA9NjM2ODQzNTM3MDAwMDAwMDAwZAIJDxYCHwAFXi9Qb3J0YWxTYWdyZXMvUmVzb3VyY2VzL1N0eWxlcy9BcHBfVGhlbWVzL05ld1RoZW1lL05ld1RoZW1lMDEvZXN0aWxvLmNzcz9mcD02MzYxMDU4MjY2NDAwMDAwMDBkAgMPZBYEAgcPDxYEHgRUZXh0BQ1TYWdyZXMgUG9ydGFsHgdWaXNpYmxlaGRkAgsPZBYGAgEPDxYCHwJoZGQCAw88KwAKAQAPFgIeDVJlbWVtYmVyTWVTZXRoZGQCBQ9kFgICAg9kFgICAQ8WAh4LXyFJdGVtQ291bnRmZGT2jq3GdOJCykutzHHj/n4FNUsnUw==";
const UESB_EVENT_VALIDATION: &str = "/wEdAARSewvwfiowtbmcj5TsbyonM4nqN81slLG8uEFL8sVLUjoauXZ8QTl2nEJmPx53FYhjUq3W1Gjeb7bKHHg4dlobnNndlhakCWrxjhOs6ggtYAyWZPU=";

fn builtin(
    id: &str,
    base_url: &str,
    api_url: Option<&str>,
    view_state: &str,
    view_state_generator: &str,
    event_validation: &str,
) -> Institution {
    Institution {
        id: id.to_string(),
        base_url: base_url.to_string(),
        api_url: api_url.map(str::to_string),
        view_state: view_state.to_string(),
        view_state_generator: view_state_generator.to_string(),
        event_validation: event_validation.to_string(),
        captcha: None,
    }
}

// ── Registry ────────────────────────────────────────────────────────────────

/// Case-insensitive registry of known deployments.
#[derive(Debug, Clone)]
pub struct InstitutionRegistry {
    entries: HashMap<String, Institution>,
}

impl Default for InstitutionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl InstitutionRegistry {
    /// Registry without any deployment.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with the four bundled deployments.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(builtin(
            "UEFS",
            "http://academico2.uefs.br/Portal",
            Some("http://academico2.uefs.br/Api/SagresApi"),
            UEFS_VIEW_STATE,
            "BB137B96",
            UEFS_EVENT_VALIDATION,
        ));
        registry.register(builtin(
            "UESC",
            "http://www.prograd.uesc.br/PortalSagres",
            None,
            UESC_VIEW_STATE,
            "065EA922",
            UESC_EVENT_VALIDATION,
        ));
        registry.register(builtin(
            "UNEB",
            "http://www.portalacademico.uneb.br/PortalSagres",
            None,
            UNEB_VIEW_STATE,
            "065EA922",
            UNEB_EVENT_VALIDATION,
        ));
        registry.register(builtin(
            "UESB",
            "http://sagres.uesb.br/PortalSagres",
            None,
            UESB_VIEW_STATE,
            "065EA922",
            UESB_EVENT_VALIDATION,
        ));
        registry
    }

    /// Add or replace a deployment.
    pub fn register(&mut self, institution: Institution) {
        self.entries
            .insert(institution.id.to_uppercase(), institution);
    }

    /// Merge deployments from a JSON array file, replacing entries with the same id.
    pub fn load_json(&mut self, path: &Path) -> SagresResult<usize> {
        let content = std::fs::read_to_string(path)?;
        let institutions: Vec<Institution> = serde_json::from_str(&content)?;
        let count = institutions.len();
        for institution in institutions {
            self.register(institution);
        }
        tracing::debug!("Loaded {count} institutions from {}", path.display());
        Ok(count)
    }

    /// Look up a deployment by id, ignoring case.
    pub fn get(&self, id: &str) -> SagresResult<&Institution> {
        self.entries
            .get(&id.to_uppercase())
            .ok_or_else(|| SagresError::UnknownInstitution(id.to_string()))
    }

    /// Ids of every registered deployment, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
