//! Initial schema: invoices, invoice lines, buying price records, audit log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "DROP TABLE IF EXISTS audit_log CASCADE;
             DROP TABLE IF EXISTS invoice_lines CASCADE;
             DROP TABLE IF EXISTS invoices CASCADE;
             DROP TABLE IF EXISTS buying_price_records CASCADE;",
        )
        .await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
-- Invoice headers
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    source_message_id TEXT,
    sender TEXT,
    pdf_object_key TEXT,
    pdf_filename TEXT,
    supplier_name TEXT,
    invoice_number TEXT,
    invoice_date DATE,
    currency VARCHAR(8),
    net_amount NUMERIC(14,4),
    vat_amount NUMERIC(14,4),
    freight_amount NUMERIC(14,4),
    total_amount NUMERIC(14,4),
    status VARCHAR(16) NOT NULL DEFAULT 'received'
        CHECK (status IN ('received', 'parsed', 'validated', 'needs_review', 'disputed')),
    validated_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- One invoice per mail message; ingestion dedup relies on this
CREATE UNIQUE INDEX idx_invoices_source_message ON invoices(source_message_id)
    WHERE source_message_id IS NOT NULL;

-- Status drains read newest first
CREATE INDEX idx_invoices_status ON invoices(status, created_at DESC);

-- Invoice lines; replaced wholesale on re-extraction
CREATE TABLE invoice_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    sku TEXT,
    product_name TEXT,
    description TEXT,
    quantity NUMERIC(14,4),
    unit VARCHAR(32),
    unit_price NUMERIC(14,4),
    discount_percent NUMERIC(7,4),
    discount_total NUMERIC(14,4),
    net_amount NUMERIC(14,4),
    line_total NUMERIC(14,4),
    vat_rate NUMERIC(7,4),
    match_status VARCHAR(32)
        CHECK (match_status IN ('match', 'mismatch', 'created_price_record', 'unknown', 'no_match')),
    matched_price NUMERIC(14,4),
    price_delta NUMERIC(14,4),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_invoice_lines_invoice ON invoice_lines(invoice_id, line_no);

-- Time-bounded reference prices
CREATE TABLE buying_price_records (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    supplier_name TEXT NOT NULL,
    sku TEXT,
    product_name TEXT,
    unit_price NUMERIC(14,4) NOT NULL,
    currency VARCHAR(8),
    valid_from DATE,
    valid_to DATE,
    status VARCHAR(16) NOT NULL DEFAULT 'active'
        CHECK (status IN ('active', 'need_review')),
    source VARCHAR(32) NOT NULL DEFAULT 'manual'
        CHECK (source IN ('manual', 'learned_from_invoice')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- SKU lookup (primary matching path)
CREATE INDEX idx_price_records_sku ON buying_price_records(supplier_name, sku);

-- Case-insensitive product-name fallback
CREATE INDEX idx_price_records_product ON buying_price_records(supplier_name, lower(product_name));

-- Append-only audit trail
CREATE TABLE audit_log (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entity_type VARCHAR(32) NOT NULL,
    entity_id UUID NOT NULL,
    action VARCHAR(32) NOT NULL,
    details JSONB NOT NULL DEFAULT '{}',
    performed_by UUID,
    performed_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_audit_log_entity ON audit_log(entity_type, entity_id, performed_at DESC);
";
