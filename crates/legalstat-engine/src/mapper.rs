//! # Status Code Mapper
//!
//! Normalizes office-specific status wording onto [`UnifiedStatusCode`].
//!
//! Each jurisdiction owns an independent `raw status → unified code` table.
//! Tables are data, not behavior: the built-in set covers CNIPA, USPTO,
//! EPO, JPO and KIPO wording, and deployments can override or extend it
//! from YAML without touching code.
//!
//! ## Lookup rules
//!
//! - Jurisdiction codes are trimmed and upper-cased.
//! - Raw strings are trimmed and upper-cased (a no-op for CJK wording), so
//!   `"Patented Case"` and `"PATENTED CASE"` resolve alike.
//! - Unknown jurisdiction or unknown wording yields `(Filed, exact_match =
//!   false)`. `Filed` is active and non-terminal, so a fallback can never
//!   trigger a lapse-style anomaly.

use std::collections::BTreeMap;
use std::sync::Arc;

use legalstat_core::{JurisdictionCode, UnifiedStatusCode};
use serde::Serialize;

use crate::config::ConfigError;

use UnifiedStatusCode::*;

const CN_TABLE: &[(&str, UnifiedStatusCode)] = &[
    ("专利申请受理", Filed),
    ("申请", Filed),
    ("公开", Published),
    ("发明专利申请公布", Published),
    ("实质审查", UnderExamination),
    ("实质审查的生效", UnderExamination),
    ("授权", Granted),
    ("专利权维持", Granted),
    ("未缴年费专利权终止", Lapsed),
    ("专利权终止", Lapsed),
    ("撤回", Withdrawn),
    ("视为撤回", Withdrawn),
    ("驳回", Rejected),
    ("期限届满", Expired),
    ("专利权全部无效", Revoked),
    ("复审", UnderAppeal),
    ("无效宣告请求", UnderAppeal),
    ("专利权的转移", Transferred),
    ("专利实施许可合同备案的生效", LicenseRecorded),
];

const US_TABLE: &[(&str, UnifiedStatusCode)] = &[
    ("FILED", Filed),
    ("APPLICATION UNDERGOING PREEXAM PROCESSING", Filed),
    ("PUBLISHED", Published),
    ("DOCKETED NEW CASE - READY FOR EXAMINATION", UnderExamination),
    ("NON FINAL ACTION MAILED", UnderExamination),
    ("FINAL REJECTION MAILED", UnderExamination),
    ("GRANTED", Granted),
    ("PATENTED CASE", Granted),
    ("LAPSED", Lapsed),
    ("EXPIRED - FEE RELATED", Lapsed),
    ("ABANDONED", Withdrawn),
    ("ABANDONED -- FAILURE TO RESPOND TO AN OFFICE ACTION", Withdrawn),
    ("REJECTED", Rejected),
    ("EXPIRED", Expired),
    ("PATENT EXPIRED DUE TO NONPAYMENT OF MAINTENANCE FEES UNDER 37 CFR 1.362", Lapsed),
    ("REVOKED", Revoked),
    ("PTAB - ALL CLAIMS UNPATENTABLE", Revoked),
    ("UNDER APPEAL", UnderAppeal),
    ("NOTICE OF APPEAL FILED", UnderAppeal),
    ("ASSIGNMENT RECORDED", Transferred),
    ("LICENSE RECORDED", LicenseRecorded),
];

const EP_TABLE: &[(&str, UnifiedStatusCode)] = &[
    ("APPLICATION FILED", Filed),
    ("THE APPLICATION HAS BEEN PUBLISHED", Published),
    ("REQUEST FOR EXAMINATION WAS MADE", UnderExamination),
    ("EXAMINATION IS IN PROGRESS", UnderExamination),
    ("THE PATENT HAS BEEN GRANTED", Granted),
    ("NO OPPOSITION FILED WITHIN TIME LIMIT", Granted),
    ("PATENT LAPSED", Lapsed),
    ("THE APPLICATION HAS BEEN WITHDRAWN", Withdrawn),
    ("THE APPLICATION IS DEEMED TO BE WITHDRAWN", Withdrawn),
    ("THE APPLICATION HAS BEEN REFUSED", Rejected),
    ("PATENT EXPIRED", Expired),
    ("PATENT REVOKED", Revoked),
    ("OPPOSITION FILED WITHIN TIME LIMIT", UnderAppeal),
    ("APPEAL PENDING", UnderAppeal),
    ("TRANSFER OF RIGHTS RECORDED", Transferred),
    ("LICENCE REGISTERED", LicenseRecorded),
];

const JP_TABLE: &[(&str, UnifiedStatusCode)] = &[
    ("出願", Filed),
    ("公開", Published),
    ("審査請求済", UnderExamination),
    ("審査中", UnderExamination),
    ("登録", Granted),
    ("年金不納による抹消", Lapsed),
    ("取下", Withdrawn),
    ("みなし取下", Withdrawn),
    ("拒絶査定", Rejected),
    ("存続期間満了", Expired),
    ("無効審決確定", Revoked),
    ("審判請求", UnderAppeal),
    ("異議申立", UnderAppeal),
    ("移転登録", Transferred),
    ("専用実施権設定登録", LicenseRecorded),
];

const KR_TABLE: &[(&str, UnifiedStatusCode)] = &[
    ("출원", Filed),
    ("공개", Published),
    ("심사청구", UnderExamination),
    ("심사중", UnderExamination),
    ("등록", Granted),
    ("등록료 불납 소멸", Lapsed),
    ("소멸", Lapsed),
    ("취하", Withdrawn),
    ("취하간주", Withdrawn),
    ("거절결정", Rejected),
    ("존속기간 만료", Expired),
    ("무효", Revoked),
    ("심판청구", UnderAppeal),
    ("권리이전", Transferred),
    ("실시권 등록", LicenseRecorded),
];

fn normalize_raw(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn normalize_jurisdiction(jurisdiction: &str) -> String {
    jurisdiction.trim().to_uppercase()
}

/// Per-jurisdiction vocabulary tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusTables {
    tables: BTreeMap<String, BTreeMap<String, UnifiedStatusCode>>,
}

impl StatusTables {
    /// The built-in CN/US/EP/JP/KR tables.
    pub fn builtin() -> Self {
        let mut tables = Self::default();
        for (jurisdiction, entries) in [
            ("CN", CN_TABLE),
            ("US", US_TABLE),
            ("EP", EP_TABLE),
            ("JP", JP_TABLE),
            ("KR", KR_TABLE),
        ] {
            for (raw, code) in entries {
                tables.insert(jurisdiction, raw, *code);
            }
        }
        tables
    }

    /// Parse tables from YAML shaped as `jurisdiction: { raw: CODE }`.
    ///
    /// ```yaml
    /// TW:
    ///   "公告": GRANTED
    ///   "消滅": LAPSED
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, BTreeMap<String, UnifiedStatusCode>> =
            serde_yaml::from_str(yaml)?;
        let mut tables = Self::default();
        for (jurisdiction, entries) in raw {
            if jurisdiction.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "status table jurisdiction must not be empty".into(),
                ));
            }
            for (status, code) in entries {
                if status.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "empty raw status in {jurisdiction} table"
                    )));
                }
                tables.insert(&jurisdiction, &status, code);
            }
        }
        Ok(tables)
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, jurisdiction: &str, raw_status: &str, code: UnifiedStatusCode) {
        self.tables
            .entry(normalize_jurisdiction(jurisdiction))
            .or_default()
            .insert(normalize_raw(raw_status), code);
    }

    /// Overlay `other` onto `self`; entries in `other` win.
    pub fn merge(&mut self, other: StatusTables) {
        for (jurisdiction, entries) in other.tables {
            let table = self.tables.entry(jurisdiction).or_default();
            table.extend(entries);
        }
    }

    /// Exact table lookup after normalization.
    pub fn lookup(&self, jurisdiction: &str, raw_status: &str) -> Option<UnifiedStatusCode> {
        self.tables
            .get(&normalize_jurisdiction(jurisdiction))
            .and_then(|table| table.get(&normalize_raw(raw_status)))
            .copied()
    }

    /// Jurisdictions with a table, in sorted order.
    pub fn jurisdictions(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Entries of one jurisdiction's table, if any.
    pub fn entries(
        &self,
        jurisdiction: &str,
    ) -> Option<impl Iterator<Item = (&str, UnifiedStatusCode)>> {
        self.tables
            .get(&normalize_jurisdiction(jurisdiction))
            .map(|table| table.iter().map(|(raw, code)| (raw.as_str(), *code)))
    }
}

/// Result of mapping one raw status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MappedStatus {
    pub code: UnifiedStatusCode,
    /// `false` when the fallback was used.
    pub exact_match: bool,
}

impl MappedStatus {
    /// Returned for unknown jurisdictions and unknown wording.
    pub const FALLBACK: MappedStatus = MappedStatus {
        code: UnifiedStatusCode::Filed,
        exact_match: false,
    };
}

/// Pure, total mapper over shared immutable tables. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusMapper {
    tables: Arc<StatusTables>,
}

impl StatusMapper {
    pub fn new(tables: Arc<StatusTables>) -> Self {
        Self { tables }
    }

    /// Mapper over the built-in tables.
    pub fn builtin() -> Self {
        Self::new(Arc::new(StatusTables::builtin()))
    }

    /// Map a raw status reported under `jurisdiction`. Never fails.
    pub fn map(&self, jurisdiction: &str, raw_status: &str) -> MappedStatus {
        match self.tables.lookup(jurisdiction, raw_status) {
            Some(code) => MappedStatus {
                code,
                exact_match: true,
            },
            None => MappedStatus::FALLBACK,
        }
    }

    /// [`map`](Self::map) for an already validated jurisdiction code.
    pub fn map_code(&self, jurisdiction: &JurisdictionCode, raw_status: &str) -> MappedStatus {
        self.map(jurisdiction.as_str(), raw_status)
    }

    pub fn tables(&self) -> &StatusTables {
        &self.tables
    }
}
