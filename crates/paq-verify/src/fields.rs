//! Default field catalogues for each product type (spec.md §3 required /
//! product-dependent keys).
//!
//! The label strings are the human-readable text a PAQ/application form
//! uses for each field; the locator fuzzy-matches against these, not the
//! case-model key name.

use crate::types::case_model::ProductType;
use crate::types::{FieldSpec, FieldType, SearchStrategy};

fn common_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new("caseId", vec!["Case reference no", "Case reference number"], FieldType::Reference, true, SearchStrategy::Right),
        FieldSpec::new("loanAmount", vec!["Loan amount", "Amount of loan"], FieldType::Currency, true, SearchStrategy::Right),
        FieldSpec::new("instalment", vec!["Instalment", "Monthly instalment"], FieldType::Currency, true, SearchStrategy::Right),
        FieldSpec::new("interestRate", vec!["Interest rate", "Rate of interest"], FieldType::Percentage, true, SearchStrategy::Right),
        FieldSpec::new("insurancePremium", vec!["Insurance premium"], FieldType::Currency, true, SearchStrategy::Right),
        FieldSpec::new("collectionAccountNo", vec!["Collection account no", "Debit order account number"], FieldType::Account, true, SearchStrategy::Right),
    ]
}

fn product_dependent_fields(product: ProductType) -> Vec<FieldSpec> {
    match product {
        ProductType::PersonalLoan => vec![
            FieldSpec::new("initiationFee", vec!["Initiation fee"], FieldType::Currency, true, SearchStrategy::Right),
            FieldSpec::new("serviceFee", vec!["Service fee", "Monthly service fee"], FieldType::Currency, true, SearchStrategy::Right),
            FieldSpec::new("disbursementAccountNo", vec!["Disbursement account no", "Pay-out account number"], FieldType::Account, true, SearchStrategy::Right),
        ],
        ProductType::Overdraft => vec![FieldSpec::new(
            "serviceFee",
            vec!["Service fee", "Monthly service fee"],
            FieldType::Currency,
            true,
            SearchStrategy::Right,
        )],
        ProductType::CreditCard => vec![FieldSpec::new(
            "collectionBank",
            vec!["Collection bank", "Bank name"],
            FieldType::Text,
            false,
            SearchStrategy::Right,
        )],
    }
}

/// The complete required-field catalogue for a product (spec.md §3).
pub fn field_catalogue(product: ProductType) -> Vec<FieldSpec> {
    let mut fields = common_fields();
    fields.extend(product_dependent_fields(product));
    fields
}
