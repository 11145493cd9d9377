//! Built-in federal catalog.
//!
//! Stands in for the NIH, SBIR, SAM and ClinicalTrials.gov feeds when no
//! HTTP source is configured. Dates are fixed except for trial-derived
//! entries, which are due 30 days after `today`.

use chrono::NaiveDate;

use crate::opportunity::{
    CpicAlignment, EvidenceLevel, Expression, FundingMechanism, FundingSource, GenomicCriteria,
    Opportunity, OpportunityStatus, RegistrationStatus, ReimbursementPotential, SiteStatus,
    TrialOpportunity, TrialPhase, TrialSite, TrialStatus,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

struct Listing<'a> {
    id: &'a str,
    source: FundingSource,
    kind: FundingMechanism,
    title: &'a str,
    agency: &'a str,
    institute: &'a str,
    program: &'a str,
    announcement: &'a str,
    due: NaiveDate,
    budget_cap: u64,
    months: u32,
    description: &'a str,
    keywords: &'a [&'a str],
    eligibility: &'a [&'a str],
    priorities: &'a [&'a str],
    genes: &'a [&'a str],
    drugs: &'a [&'a str],
    guidelines: &'a [&'a str],
    evidence: EvidenceLevel,
    implementation_score: u8,
    reimbursement: ReimbursementPotential,
}

impl Listing<'_> {
    fn build(self) -> Opportunity {
        Opportunity {
            id: self.id.into(),
            source: self.source,
            kind: self.kind,
            title: self.title.into(),
            agency: self.agency.into(),
            institute: self.institute.into(),
            program: self.program.into(),
            announcement_number: self.announcement.into(),
            due_date: self.due,
            budget_cap: self.budget_cap,
            duration_months: self.months,
            description: self.description.into(),
            keywords: strings(self.keywords),
            eligibility_criteria: strings(self.eligibility),
            strategic_priorities: strings(self.priorities),
            cpic_alignment: CpicAlignment {
                genes: strings(self.genes),
                drugs: strings(self.drugs),
                guidelines: strings(self.guidelines),
                evidence_level: self.evidence,
                implementation_score: self.implementation_score,
                reimbursement_potential: self.reimbursement,
            },
            match_score: 0.0,
            status: OpportunityStatus::Active,
            submission_history: Vec::new(),
        }
    }
}

/// NIH RePORTER listings.
pub fn nih_opportunities() -> Vec<Opportunity> {
    vec![
        Listing {
            id: "NIH_R01_CA_2024_001",
            source: FundingSource::Nih,
            kind: FundingMechanism::R01,
            title: "Precision Oncology Implementation in Clinical Practice",
            agency: "NIH",
            institute: "NCI",
            program: "Cancer Prevention and Control Research Program",
            announcement: "RFA-CA-24-015",
            due: date(2024, 3, 15),
            budget_cap: 500_000,
            months: 60,
            description: "Support implementation of precision oncology approaches in clinical practice settings",
            keywords: &["precision oncology", "genomics", "clinical implementation", "CPIC"],
            eligibility: &["Academic medical centers", "Healthcare systems", "Research institutions"],
            priorities: &["Cancer Moonshot", "Precision Medicine Initiative", "All of Us Research Program"],
            genes: &["CYP2D6", "CYP2C19", "DPYD", "TPMT"],
            drugs: &["tamoxifen", "clopidogrel", "fluorouracil", "mercaptopurine"],
            guidelines: &["CPIC", "PharmGKB", "FDA"],
            evidence: EvidenceLevel::A,
            implementation_score: 95,
            reimbursement: ReimbursementPotential::High,
        }
        .build(),
        Listing {
            id: "NIH_U01_HG_2024_002",
            source: FundingSource::Nih,
            kind: FundingMechanism::U01,
            title: "Genomic Data Integration for Clinical Decision Support",
            agency: "NIH",
            institute: "NHGRI",
            program: "Clinical Genome Resource",
            announcement: "RFA-HG-24-008",
            due: date(2024, 4, 1),
            budget_cap: 750_000,
            months: 72,
            description: "Develop and validate genomic data integration platforms for clinical decision support",
            keywords: &["genomics", "clinical decision support", "FHIR", "interoperability"],
            eligibility: &["Research institutions", "Healthcare systems", "Technology companies"],
            priorities: &["Genomic Medicine", "Health IT", "Precision Medicine"],
            genes: &["BRCA1", "BRCA2", "MLH1", "MSH2"],
            drugs: &["olaparib", "pembrolizumab", "trastuzumab"],
            guidelines: &["NCCN", "CPIC", "ACMG"],
            evidence: EvidenceLevel::A,
            implementation_score: 88,
            reimbursement: ReimbursementPotential::High,
        }
        .build(),
    ]
}

/// SBIR.gov listings.
pub fn sbir_opportunities() -> Vec<Opportunity> {
    vec![Listing {
        id: "SBIR_HHS_2024_001",
        source: FundingSource::Sbir,
        kind: FundingMechanism::SbirI,
        title: "AI-Driven Clinical Trial Matching Platform",
        agency: "HHS",
        institute: "ONC",
        program: "Health IT Innovation",
        announcement: "SBIR-24-HHS-001",
        due: date(2024, 2, 28),
        budget_cap: 300_000,
        months: 12,
        description: "Develop AI-powered platforms for automated clinical trial patient matching",
        keywords: &["AI", "clinical trials", "patient matching", "automation"],
        eligibility: &["Small businesses", "Startups", "Technology companies"],
        priorities: &["Health IT", "AI Innovation", "Clinical Research"],
        genes: &["CYP2D6", "CYP2C19"],
        drugs: &["warfarin", "clopidogrel"],
        guidelines: &["CPIC"],
        evidence: EvidenceLevel::B,
        implementation_score: 75,
        reimbursement: ReimbursementPotential::Medium,
    }
    .build()]
}

/// SAM.gov listings.
pub fn sam_opportunities() -> Vec<Opportunity> {
    vec![Listing {
        id: "DOD_BAA_2024_001",
        source: FundingSource::Dod,
        kind: FundingMechanism::Baa,
        title: "Advanced Medical Technologies for Military Healthcare",
        agency: "DOD",
        institute: "DARPA",
        program: "Biological Technologies Office",
        announcement: "HR001124S0001",
        due: date(2024, 6, 30),
        budget_cap: 2_000_000,
        months: 36,
        description: "Develop advanced medical technologies for military and veteran healthcare",
        keywords: &["military medicine", "precision medicine", "genomics", "AI"],
        eligibility: &["Defense contractors", "Research institutions", "Technology companies"],
        priorities: &["Military Medicine", "Precision Medicine", "AI/ML"],
        genes: &["CYP2D6", "CYP2C19", "COMT", "OPRM1"],
        drugs: &["morphine", "codeine", "tramadol"],
        guidelines: &["CPIC", "VA/DoD"],
        evidence: EvidenceLevel::A,
        implementation_score: 92,
        reimbursement: ReimbursementPotential::High,
    }
    .build()]
}

/// ClinicalTrials.gov listings.
pub fn clinical_trials() -> Vec<TrialOpportunity> {
    vec![TrialOpportunity {
        id: "TRIAL_001".into(),
        nct_id: Some("NCT05123456".into()),
        title: "Precision Oncology Trial for Breast Cancer".into(),
        phase: TrialPhase::II,
        condition: "Breast Cancer".into(),
        intervention: "Targeted Therapy".into(),
        sponsor: "Norton Healthcare".into(),
        sites: vec![TrialSite {
            name: "Norton Cancer Institute".into(),
            location: "Louisville, KY".into(),
            principal_investigator: "Dr. Sameer Talwalkar".into(),
            status: SiteStatus::Recruiting,
            target_enrollment: 100,
        }],
        inclusion_criteria: strings(&["HER2+ breast cancer", "Age 18-75", "ECOG 0-1"]),
        exclusion_criteria: strings(&["Prior targeted therapy", "Pregnancy", "Severe comorbidities"]),
        genomic_requirements: vec![
            GenomicCriteria {
                gene: "HER2".into(),
                variant: None,
                expression: Some(Expression::High),
                biomarker: None,
                required: true,
                cpic_relevant: false,
            },
            GenomicCriteria {
                gene: "CYP2D6".into(),
                variant: Some("*4/*4".into()),
                expression: None,
                biomarker: None,
                required: false,
                cpic_relevant: true,
            },
        ],
        estimated_enrollment: 200,
        status: TrialStatus::Recruiting,
        registration_status: RegistrationStatus::Live,
    }]
}

/// Every listing in feed order, trials folded into opportunities.
pub fn federal_catalog(today: NaiveDate) -> Vec<Opportunity> {
    let mut all = nih_opportunities();
    all.extend(sbir_opportunities());
    all.extend(sam_opportunities());
    all.extend(clinical_trials().iter().map(|t| t.to_opportunity(today)));
    all
}
