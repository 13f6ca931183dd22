//! Sample corpus loaded by `DocumentStore::with_sample_documents`

use chrono::NaiveDate;

use crate::models::Record;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("sample date is valid")
}

pub fn sample_documents() -> Vec<Record> {
    vec![
        Record::new(
            "INV-001",
            "Invoice #12345",
            "Invoice #12345
Date: 2024-01-15
Client: Acme Corporation

Services Rendered:
- Consulting Services: $5,000
- Software Development: $12,500
- Support & Maintenance: $2,500

Subtotal: $20,000
Tax (10%): $2,000

Payment Terms: Net 30 days",
            "invoice",
        )
        .with_metadata("client", "Acme Corporation")
        .with_metadata("date", date(2024, 1, 15)),
        Record::new(
            "CON-001",
            "Service Agreement",
            "SERVICE AGREEMENT

This Service Agreement is entered into on January 1, 2024, between:
- Provider: DocDacity Solutions Inc.
- Client: Healthcare Partners LLC

Services:
1. Document Processing Platform Access
2. 24/7 Technical Support
3. Monthly Data Analytics Reports
4. Compliance Monitoring

Duration: 12 months
Monthly Fee: $15,000
Total Contract Value: $180,000

Termination: Either party may terminate with 60 days written notice.",
            "contract",
        )
        .with_metadata("value", 180000_i64)
        .with_metadata("duration_months", 12_i64)
        .with_metadata("client", "Healthcare Partners LLC"),
        Record::new(
            "CLM-001",
            "Insurance Claim #78901",
            "INSURANCE CLAIM FORM
Claim Number: 78901
Date of Incident: 2024-02-10
Policy Number: POL-456789

Claimant: John Doe
Type of Claim: Medical Expense Reimbursement

Expenses:
- Hospital Visit: $1,200
- Diagnostic Tests: $800
- Medication: $150
- Follow-up Consultation: $300

Total Claim Amount: $2,450

Status: Under Review",
            "claim",
        )
        .with_metadata("amount", 2450_i64)
        .with_metadata("status", "Under Review")
        .with_metadata("claimant", "John Doe"),
        Record::new(
            "INV-002",
            "Invoice #12346",
            "Invoice #12346
Date: 2024-02-20
Client: TechStart Inc.

Products:
- Enterprise License (Annual): $50,000
- Implementation Services: $15,000
- Training Package: $5,000

Subtotal: $70,000
Discount (10%): -$7,000
Tax (10%): $6,300
Total Due: $69,300

Payment Terms: Net 45 days",
            "invoice",
        )
        .with_metadata("total", 69300_i64)
        .with_metadata("client", "TechStart Inc.")
        .with_metadata("date", date(2024, 2, 20)),
        Record::new(
            "INV-003",
            "Invoice #12347",
            "Invoice #12347
Date: 2024-03-01
Client: Global Corp

Services:
- Annual Subscription: $120,000
- Premium Support: $30,000
- Custom Development: $45,000

Subtotal: $195,000
Tax (10%): $19,500
Total Due: $214,500

Payment Terms: Net 60 days",
            "invoice",
        )
        .with_metadata("total", 214500_i64)
        .with_metadata("client", "Global Corp")
        .with_metadata("date", date(2024, 3, 1)),
    ]
}
